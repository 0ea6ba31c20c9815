//! Export enumeration from native object formats.
//!
//! Each format is a zero-sized reader implementing [`ExportReader`]. The
//! reader for the host platform is picked at build time through
//! [`NativeReader`]; the others stay available for offline inspection of
//! foreign binaries.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod elf;
pub mod macho;
pub mod pe;

pub use elf::ElfReader;
pub use macho::{ArchSlice, MachOReader};
pub use pe::PeReader;

/// Reader for the object format the host's loader consumes.
#[cfg(windows)]
pub type NativeReader = PeReader;
/// Reader for the object format the host's loader consumes.
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub type NativeReader = MachOReader;
/// Reader for the object format the host's loader consumes.
#[cfg(not(any(windows, target_os = "macos", target_os = "ios")))]
pub type NativeReader = ElfReader;

/// Object formats with a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryFormat {
    Elf,
    MachO,
    Pe,
}

impl BinaryFormat {
    #[cfg(windows)]
    pub const NATIVE: BinaryFormat = BinaryFormat::Pe;
    #[cfg(any(target_os = "macos", target_os = "ios"))]
    pub const NATIVE: BinaryFormat = BinaryFormat::MachO;
    #[cfg(not(any(windows, target_os = "macos", target_os = "ios")))]
    pub const NATIVE: BinaryFormat = BinaryFormat::Elf;

    pub fn name(&self) -> &'static str {
        match self {
            BinaryFormat::Elf => "ELF",
            BinaryFormat::MachO => "Mach-O",
            BinaryFormat::Pe => "PE",
        }
    }
}

impl fmt::Display for BinaryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A raw exported name as found in the binary, before demangling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawExport {
    pub name: String,
    pub loadable: bool,
}

/// Answers whether the live module can resolve a name to an address.
pub trait SymbolProbe {
    fn is_loadable(&self, name: &str) -> bool;
}

impl<F> SymbolProbe for F
where
    F: Fn(&str) -> bool,
{
    fn is_loadable(&self, name: &str) -> bool {
        self(name)
    }
}

/// Probe for images that were never loaded; nothing resolves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unloaded;

impl SymbolProbe for Unloaded {
    fn is_loadable(&self, _name: &str) -> bool {
        false
    }
}

/// Trait implemented by the per-format readers.
pub trait ExportReader {
    const FORMAT: BinaryFormat;

    /// Enumerate exported names of the image in `bytes`, asking `probe` which
    /// of them the loader resolves.
    fn read_exports(bytes: &[u8], probe: &dyn SymbolProbe) -> Result<Vec<RawExport>>;
}

/// Sniff the object format from the leading magic bytes.
pub fn detect_format(bytes: &[u8]) -> Option<BinaryFormat> {
    let head: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    if &head == goblin::elf::header::ELFMAG {
        return Some(BinaryFormat::Elf);
    }
    if u16::from_le_bytes([head[0], head[1]]) == goblin::pe::header::DOS_MAGIC {
        return Some(BinaryFormat::Pe);
    }
    if macho::is_macho_magic(head) {
        return Some(BinaryFormat::MachO);
    }
    None
}

/// Push `name` unless it is empty or already present; the first sighting
/// decides the position, later ones can only upgrade `loadable`.
pub(crate) fn push_export(
    exports: &mut Vec<RawExport>,
    seen: &mut std::collections::HashMap<String, usize>,
    name: &str,
    probe: &dyn SymbolProbe,
) {
    if name.is_empty() {
        return;
    }
    match seen.get(name) {
        Some(&idx) => {
            if !exports[idx].loadable {
                exports[idx].loadable = probe.is_loadable(name);
            }
        }
        None => {
            seen.insert(name.to_string(), exports.len());
            exports.push(RawExport { name: name.to_string(), loadable: probe.is_loadable(name) });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_formats_from_magic() {
        assert_eq!(detect_format(b"\x7fELF\x02\x01\x01"), Some(BinaryFormat::Elf));
        assert_eq!(detect_format(b"MZ\x90\x00"), Some(BinaryFormat::Pe));
        assert_eq!(detect_format(&0xfeed_facf_u32.to_le_bytes()), Some(BinaryFormat::MachO));
        assert_eq!(detect_format(&0xfeed_face_u32.to_be_bytes()), Some(BinaryFormat::MachO));
        assert_eq!(detect_format(&0xcafe_babe_u32.to_be_bytes()), Some(BinaryFormat::MachO));
        assert_eq!(detect_format(b"#!/bin/sh"), None);
        assert_eq!(detect_format(b"MZ"), None);
    }

    #[test]
    fn push_export_merges_loadable_flags() {
        let mut exports = Vec::new();
        let mut seen = std::collections::HashMap::new();
        push_export(&mut exports, &mut seen, "a", &|_: &str| false);
        push_export(&mut exports, &mut seen, "", &|_: &str| true);
        push_export(&mut exports, &mut seen, "a", &|_: &str| true);
        push_export(&mut exports, &mut seen, "a", &|_: &str| false);
        assert_eq!(exports, vec![RawExport { name: "a".into(), loadable: true }]);
    }
}
