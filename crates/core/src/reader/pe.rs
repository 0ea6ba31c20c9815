//! PE export directory.

use std::collections::HashMap;

use goblin::pe::PE;
use log::debug;

use super::{push_export, BinaryFormat, ExportReader, RawExport, SymbolProbe};
use crate::error::{Error, Result};

pub struct PeReader;

impl ExportReader for PeReader {
    const FORMAT: BinaryFormat = BinaryFormat::Pe;

    fn read_exports(bytes: &[u8], probe: &dyn SymbolProbe) -> Result<Vec<RawExport>> {
        let pe = PE::parse(bytes)?;
        if pe.export_data.is_none() {
            return Err(Error::format("no export directory found"));
        }

        let mut exports = Vec::new();
        let mut seen = HashMap::new();
        for export in &pe.exports {
            // Ordinal-only exports have no name to resolve.
            if let Some(name) = export.name {
                push_export(&mut exports, &mut seen, name, probe);
            }
        }
        debug!("PE export directory: {} named exports", exports.len());
        Ok(exports)
    }
}
