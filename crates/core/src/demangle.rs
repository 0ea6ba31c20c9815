//! Demangling of raw exported names into formatted signatures.

use cpp_demangle::{DemangleOptions, Symbol};
use msvc_demangler::DemangleFlags;

use crate::format::{format_gnu_signature, format_msvc_signature};

/// Demangle `raw` with the scheme(s) of the host toolchain.
///
/// Returns `None` when the name is not a decorated C++ name; callers then
/// treat it as a plain C symbol.
#[cfg(windows)]
pub fn demangle(raw: &str) -> Option<String> {
    msvc(raw).or_else(|| itanium(raw))
}

/// Demangle `raw` with the scheme(s) of the host toolchain.
///
/// Returns `None` when the name is not a decorated C++ name; callers then
/// treat it as a plain C symbol.
#[cfg(not(windows))]
pub fn demangle(raw: &str) -> Option<String> {
    itanium(raw)
}

/// Itanium C++ ABI (gcc, clang, MinGW).
pub fn itanium(raw: &str) -> Option<String> {
    // Only real manglings; a bare `i` would otherwise decode as the type `int`.
    if !raw.starts_with("_Z") {
        return None;
    }
    let symbol = Symbol::new(raw).ok()?;
    let demangled = symbol.demangle(&DemangleOptions::default()).ok()?;
    if demangled.is_empty() {
        return None;
    }
    Some(format_gnu_signature(&demangled))
}

/// MSVC decorated names.
///
/// Functions come back formatted; variables come back as their qualified
/// name only, since there is no parameter list to normalize.
pub fn msvc(raw: &str) -> Option<String> {
    if !raw.starts_with('?') {
        return None;
    }
    let signature = msvc_demangler::demangle(
        raw,
        DemangleFlags::NO_FUNCTION_RETURNS | DemangleFlags::NO_MS_KEYWORDS,
    )
    .ok()?;
    let name = msvc_demangler::demangle(raw, DemangleFlags::NAME_ONLY).ok()?;

    // signature "tools::adder(double, double)" vs name "tools::adder": function.
    // signature "double meaning_of_life" vs name "meaning_of_life": variable.
    // Leftover calling conventions in front of the name are dropped.
    match signature.find(&name) {
        Some(pos) if signature[pos + name.len()..].starts_with('(') => {
            Some(format_msvc_signature(&signature[pos..]))
        }
        _ => Some(name),
    }
}
