//! Loader configuration, stored as JSON.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::library::Decorations;
use crate::resolver::Resolver;

/// How file names passed to [`crate::Library::open`] are decorated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DecorationMode {
    /// `lib` prefix and the platform suffix (`.so`, `.dylib`, `.dll`).
    #[default]
    OsDefault,
    /// Use the file name as given.
    None,
    Custom {
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
    },
}

impl DecorationMode {
    pub fn decorations(&self) -> Decorations {
        match self {
            DecorationMode::OsDefault => Decorations::os_default(),
            DecorationMode::None => Decorations::none(),
            DecorationMode::Custom { prefix, suffix } => {
                Decorations::new(prefix.clone(), suffix.clone())
            }
        }
    }
}

fn default_loadable_only() -> bool {
    true
}

/// Serializable configuration of the library loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    #[serde(default)]
    pub decorations: DecorationMode,
    /// Only match symbols the OS loader can resolve.
    #[serde(default = "default_loadable_only")]
    pub loadable_only: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { decorations: DecorationMode::default(), loadable_only: default_loadable_only() }
    }
}

impl LoaderConfig {
    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.loadable_only)
    }
}

/// Read a [`LoaderConfig`] from a JSON file.
pub fn load_config(path: &Path) -> Result<LoaderConfig> {
    let config_json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read loader config at {}", path.display()))?;
    let config: LoaderConfig =
        serde_json::from_str(&config_json).context("Failed to parse loader config JSON")?;
    Ok(config)
}
