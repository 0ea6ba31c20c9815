//! Aggregation of reader output into deduplicated symbol records.

use std::collections::HashMap;

use log::debug;

use crate::demangle::demangle;
use crate::error::Result;
use crate::model::SymbolRecord;
use crate::reader::{
    BinaryFormat, ElfReader, ExportReader, MachOReader, NativeReader, PeReader, RawExport,
    SymbolProbe,
};

/// Read the image with reader `R` and build its symbol records.
pub fn build_catalog<R: ExportReader>(
    bytes: &[u8],
    probe: &dyn SymbolProbe,
) -> Result<Vec<SymbolRecord>> {
    let exports = R::read_exports(bytes, probe)?;
    debug!("{} reader returned {} exported names", R::FORMAT, exports.len());
    Ok(collect_records(exports))
}

/// Build the catalog with the reader for the host's own object format.
pub fn build_native_catalog(bytes: &[u8], probe: &dyn SymbolProbe) -> Result<Vec<SymbolRecord>> {
    build_catalog::<NativeReader>(bytes, probe)
}

/// Build the catalog of an image whose format was detected at runtime.
///
/// Only used for offline inspection; loaded libraries always go through
/// [`build_native_catalog`].
pub fn build_catalog_for(
    format: BinaryFormat,
    bytes: &[u8],
    probe: &dyn SymbolProbe,
) -> Result<Vec<SymbolRecord>> {
    match format {
        BinaryFormat::Elf => build_catalog::<ElfReader>(bytes, probe),
        BinaryFormat::MachO => build_catalog::<MachOReader>(bytes, probe),
        BinaryFormat::Pe => build_catalog::<PeReader>(bytes, probe),
    }
}

/// Demangle, format and deduplicate raw exports.
///
/// The first occurrence of a name fixes its position; a duplicate only
/// contributes its `loadable` flag (logical OR).
pub fn collect_records<I>(exports: I) -> Vec<SymbolRecord>
where
    I: IntoIterator<Item = RawExport>,
{
    let mut records: Vec<SymbolRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for RawExport { name, loadable } in exports {
        if name.is_empty() {
            continue;
        }
        if let Some(&idx) = index.get(&name) {
            records[idx].loadable |= loadable;
            continue;
        }
        let record = match demangle(&name) {
            Some(signature) => SymbolRecord::cpp(name.clone(), signature, loadable),
            None => SymbolRecord::c(name.clone(), loadable),
        };
        index.insert(name, records.len());
        records.push(record);
    }
    records
}
