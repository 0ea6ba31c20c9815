//! libsym-core
//!
//! Shared-library loading with symbol enumeration and name resolution.
//!
//! Exported names are read straight from the library file (ELF, Mach-O
//! including FAT, or PE), demangled and normalized into [`SymbolRecord`]s,
//! and probed against the live handle. A lookup that misses as a raw name is
//! retried against the demangled signatures, so callers can ask for
//! `tools::adder(double, double)` instead of `_ZN5tools5adderEdd`.
//!
//! All substantive logic lives here; the `libsym` CLI is a thin frontend.

pub mod catalog;
pub mod config;
pub mod demangle;
pub mod error;
pub mod format;
pub mod library;
pub mod model;
pub mod reader;
pub mod resolver;

pub use config::{load_config, DecorationMode, LoaderConfig};
pub use error::{Error, Result};
pub use library::{Decorations, Library};
pub use model::{SymbolKind, SymbolRecord};
pub use reader::{detect_format, BinaryFormat};
pub use resolver::Resolver;

/// Returns the library version as encoded at compile time.
///
/// Useful for tests and for frontends to report consistent version info.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
