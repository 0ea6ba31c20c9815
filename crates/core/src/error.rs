use std::path::PathBuf;

use thiserror::Error;

/// Error type shared by the reader, catalog, resolver and library wrapper.
#[derive(Debug, Error)]
pub enum Error {
    /// The binary's structural metadata could not be parsed.
    #[error("Invalid binary format: {0}")]
    Format(String),

    /// No exported symbol matched the requested name.
    ///
    /// `native` carries the loader's own message from the failed direct lookup.
    #[error("Could not find symbol '{name}': {native}")]
    SymbolNotFound { name: String, native: String },

    /// More than one exported symbol matched the requested name.
    #[error(
        "Could not get symbol '{name}', multiple matches:\n{}",
        display_candidates(.candidates)
    )]
    MultipleMatches { name: String, candidates: Vec<String> },

    /// The library handle was closed or moved out with `Library::take`.
    #[error("Attempted to use a released library")]
    Released,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Could not load library '{path}': {message}")]
    Load { path: PathBuf, message: String },

    #[error("Could not read binary image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience result type for symbol operations.
pub type Result<T> = std::result::Result<T, Error>;

fn display_candidates(candidates: &[String]) -> String {
    candidates.iter().map(|c| format!("- {c}\n")).collect()
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Error::Format(message.into())
    }
}

impl From<goblin::error::Error> for Error {
    fn from(err: goblin::error::Error) -> Self {
        Error::Format(err.to_string())
    }
}

impl From<scroll::Error> for Error {
    fn from(err: scroll::Error) -> Self {
        Error::Format(err.to_string())
    }
}
