use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use libsym_core::{DecorationMode, Library, LoaderConfig, SymbolRecord};

/// Options shared by every command that loads a library.
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Path of the library, e.g. `./build/tools` (decorated to `./build/libtools.so`).
    #[arg(long)]
    pub path: PathBuf,

    /// Use the file name exactly as given, without OS prefix/suffix.
    #[arg(long, default_value_t = false)]
    pub no_decorations: bool,

    /// Loader config JSON; command-line flags take precedence over it.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl LoadArgs {
    /// Config file (if any) with the command-line overrides applied.
    pub fn loader_config(&self) -> Result<LoaderConfig> {
        let mut config = match &self.config {
            Some(path) => libsym_core::load_config(path)?,
            None => LoaderConfig::default(),
        };
        if self.no_decorations {
            config.decorations = DecorationMode::None;
        }
        Ok(config)
    }

    pub fn open(&self) -> Result<Library> {
        let config = self.loader_config()?;
        open_library(&self.path, &config)
    }
}

pub fn open_library(path: &Path, config: &LoaderConfig) -> Result<Library> {
    let library = Library::open_with(path, config)
        .with_context(|| format!("Failed to open library {}", path.display()))?;
    log::debug!("opened {}", library.path().display());
    Ok(library)
}

/// Keep only the records a listing asked for.
pub fn filter_records(
    records: Vec<SymbolRecord>,
    cpp_only: bool,
    loadable_only: bool,
) -> Vec<SymbolRecord> {
    records
        .into_iter()
        .filter(|record| !cpp_only || record.is_cpp())
        .filter(|record| !loadable_only || record.loadable)
        .collect()
}

/// Print records either as pretty JSON or one per line.
pub fn print_records(records: &[SymbolRecord], json: bool) -> Result<()> {
    if json {
        let serialized = serde_json::to_string_pretty(records)?;
        println!("{}", serialized);
        return Ok(());
    }

    println!("Symbols:");
    if records.is_empty() {
        println!("(none)");
        return Ok(());
    }
    for record in records {
        let loadable = if record.loadable { "loadable" } else { "not loadable" };
        if record.is_cpp() {
            println!("- {} ({}, {})", record.demangled_name, record.name, loadable);
        } else {
            println!("- {} ({})", record.name, loadable);
        }
    }
    Ok(())
}
