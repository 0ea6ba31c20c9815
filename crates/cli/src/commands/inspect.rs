use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use libsym_core::catalog::build_catalog_for;
use libsym_core::reader::{detect_format, BinaryFormat, Unloaded};
use libsym_core::SymbolRecord;
use serde::Serialize;

use crate::commands::{filter_records, print_records};
use crate::sha256_file;

#[derive(Debug, Serialize)]
struct Inspection {
    path: String,
    format: BinaryFormat,
    sha256: String,
    symbols: Vec<SymbolRecord>,
}

/// Parse a binary of any supported format without loading it.
pub fn inspect_command(path: &Path, cpp_only: bool, json: bool) -> Result<()> {
    if !path.exists() {
        return Err(anyhow!("Binary file does not exist: {}", path.display()));
    }
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read binary: {}", path.display()))?;
    let format = detect_format(&bytes)
        .ok_or_else(|| anyhow!("Unrecognized binary format: {}", path.display()))?;
    let sha256 = sha256_file(path)?;
    let symbols = build_catalog_for(format, &bytes, &Unloaded)
        .with_context(|| format!("Failed to read {} symbols from {}", format, path.display()))?;
    let symbols = filter_records(symbols, cpp_only, false);

    if json {
        let inspection =
            Inspection { path: path.display().to_string(), format, sha256, symbols };
        println!("{}", serde_json::to_string_pretty(&inspection)?);
        return Ok(());
    }

    println!("Binary:");
    println!("  Path: {}", path.display());
    println!("  Format: {}", format);
    println!("  SHA-256: {}", sha256);
    print_records(&symbols, false)
}
