use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use libsym::commands::{
    demangle_command, inspect_command, resolve_command, symbols_command, LoadArgs,
};
use libsym::log_level;

/// Shared-library symbol inspector.
///
/// This CLI is a thin wrapper around `libsym-core` (exposed in code as `libsym_core`).
/// All substantive logic lives in the library so it can be tested thoroughly
/// and reused from other frontends.
#[derive(Parser, Debug)]
#[command(
    name = "libsym",
    version,
    about = "Load shared libraries and resolve their symbols by demangled name",
    long_about = None
)]
struct Cli {
    /// Log enumeration and resolution details (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a library and list its exported symbols.
    Symbols {
        #[command(flatten)]
        load: LoadArgs,

        /// Only list symbols a lookup of this name would consider.
        #[arg(long)]
        matching: Option<String>,

        /// Only list C++ (decorated) symbols.
        #[arg(long, default_value_t = false)]
        cpp_only: bool,

        /// Only list symbols the OS loader resolves.
        #[arg(long, default_value_t = false)]
        loadable_only: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Load a library and resolve one symbol.
    ///
    /// The name may be raw (`_ZN5tools5adderEdd`) or demangled
    /// (`tools::adder(double, double)`). Ambiguous names fail and list every
    /// candidate.
    Resolve {
        #[command(flatten)]
        load: LoadArgs,

        /// Symbol to resolve.
        #[arg(long)]
        name: String,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Demangle and format symbol names.
    Demangle {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Parse a binary without loading it (ELF, Mach-O or PE).
    Inspect {
        /// Path to the binary.
        #[arg(long)]
        path: PathBuf,

        /// Only list C++ (decorated) symbols.
        #[arg(long, default_value_t = false)]
        cpp_only: bool,

        /// Emit JSON instead of human-readable text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::builder().filter_level(log_level(cli.verbose)).parse_default_env().init();
    log::debug!("libsym v{}", libsym_core::version());

    match cli.command {
        Command::Symbols { load, matching, cpp_only, loadable_only, json } => {
            symbols_command(&load, matching.as_deref(), cpp_only, loadable_only, json)?
        }
        Command::Resolve { load, name, json } => resolve_command(&load, &name, json)?,
        Command::Demangle { names } => demangle_command(&names)?,
        Command::Inspect { path, cpp_only, json } => inspect_command(&path, cpp_only, json)?,
    }

    Ok(())
}
