//! ELF symbol tables, read from the section headers of the file.

use std::collections::HashMap;

use goblin::elf::section_header::SHN_UNDEF;
use goblin::elf::sym::{Sym, STB_GLOBAL, STB_GNU_UNIQUE, STB_WEAK, STT_FUNC, STT_OBJECT};
use goblin::elf::Elf;
use log::{debug, warn};

use super::{push_export, BinaryFormat, ExportReader, RawExport, SymbolProbe};
use crate::error::Result;

pub struct ElfReader;

impl ExportReader for ElfReader {
    const FORMAT: BinaryFormat = BinaryFormat::Elf;

    fn read_exports(bytes: &[u8], probe: &dyn SymbolProbe) -> Result<Vec<RawExport>> {
        let elf = Elf::parse(bytes)?;
        let mut exports = Vec::new();
        let mut seen = HashMap::new();

        // .dynsym first: that is what the dynamic loader actually sees.
        for (table, syms, strtab) in
            [("dynsym", &elf.dynsyms, &elf.dynstrtab), ("symtab", &elf.syms, &elf.strtab)]
        {
            let mut kept = 0usize;
            for sym in syms.iter() {
                if !is_exported(&sym) {
                    continue;
                }
                let Some(name) = strtab.get_at(sym.st_name) else {
                    warn!(
                        "{table}: symbol name offset {} is outside the string table",
                        sym.st_name
                    );
                    continue;
                };
                push_export(&mut exports, &mut seen, name, probe);
                kept += 1;
            }
            debug!("ELF {table}: kept {kept} of {} entries", syms.len());
        }
        Ok(exports)
    }
}

/// Defined, externally visible function or data object.
fn is_exported(sym: &Sym) -> bool {
    sym.st_shndx != SHN_UNDEF as usize
        && matches!(sym.st_type(), STT_FUNC | STT_OBJECT)
        && matches!(sym.st_bind(), STB_GLOBAL | STB_WEAK | STB_GNU_UNIQUE)
}
