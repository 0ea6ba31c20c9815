//! Symbol records produced by the catalog.

use serde::{Deserialize, Serialize};

/// Whether a symbol carried C++ decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    C,
    Cpp,
}

/// One exported symbol of a binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Raw exported name, as the OS loader knows it.
    pub name: String,
    /// Formatted signature for C++ symbols, `name` otherwise.
    pub demangled_name: String,
    pub kind: SymbolKind,
    /// True when the live handle resolves `name` to an address.
    pub loadable: bool,
}

impl SymbolRecord {
    /// Record for an undecorated (C) symbol.
    pub fn c(name: impl Into<String>, loadable: bool) -> Self {
        let name = name.into();
        Self { demangled_name: name.clone(), name, kind: SymbolKind::C, loadable }
    }

    /// Record for a decorated (C++) symbol whose signature is already formatted.
    pub fn cpp(name: impl Into<String>, demangled_name: impl Into<String>, loadable: bool) -> Self {
        Self {
            name: name.into(),
            demangled_name: demangled_name.into(),
            kind: SymbolKind::Cpp,
            loadable,
        }
    }

    pub fn is_cpp(&self) -> bool {
        self.kind == SymbolKind::Cpp
    }
}
