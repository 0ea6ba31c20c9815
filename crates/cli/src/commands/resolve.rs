use anyhow::Result;
use serde::Serialize;

use crate::commands::LoadArgs;

#[derive(Debug, Serialize)]
struct Resolution<'a> {
    query: &'a str,
    symbol: String,
    address: String,
}

/// Resolve a raw or demangled name to an address in the loaded library.
pub fn resolve_command(load: &LoadArgs, name: &str, json: bool) -> Result<()> {
    let library = load.open()?;
    let (symbol, address) = library.resolve_symbol(name)?;
    let resolution = Resolution { query: name, symbol, address: format!("{:p}", address) };

    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
        return Ok(());
    }
    println!("Resolved:");
    println!("  Query: {}", resolution.query);
    println!("  Symbol: {}", resolution.symbol);
    println!("  Address: {}", resolution.address);
    Ok(())
}
