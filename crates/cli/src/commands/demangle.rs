use anyhow::Result;
use libsym_core::demangle::demangle;

/// Print the formatted signature of each name, or the name itself when it
/// is not a decorated C++ name.
pub fn demangle_command(names: &[String]) -> Result<()> {
    for name in names {
        match demangle(name) {
            Some(signature) => println!("{}", signature),
            None => println!("{}", name),
        }
    }
    Ok(())
}
