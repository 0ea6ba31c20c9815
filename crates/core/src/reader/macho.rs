//! Mach-O symbol tables, including FAT/universal binaries.
//!
//! The file is read as an owned byte buffer and every structure is pulled out
//! with explicit-size `scroll` reads at computed offsets. Symbol and string
//! table offsets in `LC_SYMTAB` are relative to the start of their slice.

use std::collections::HashMap;

use goblin::mach::cputype::CPU_ARCH_ABI64;
use goblin::mach::fat::FAT_MAGIC;
use goblin::mach::header::{MH_CIGAM, MH_CIGAM_64, MH_MAGIC, MH_MAGIC_64};
use goblin::mach::load_command::LC_SYMTAB;
use goblin::mach::symbols::{N_EXT, N_STAB, N_TYPE, N_UNDF};
use log::{debug, trace};
use scroll::{Endian, Pread};

use super::{push_export, BinaryFormat, ExportReader, RawExport, SymbolProbe};
use crate::error::{Error, Result};

/// FAT header variant whose `fat_arch_64` entries carry 64-bit offsets.
const FAT_MAGIC_64: u32 = 0xcafe_babf;

const FAT_HEADER_SIZE: usize = 8;
const FAT_ARCH_SIZE: usize = 20;
const FAT_ARCH_64_SIZE: usize = 32;
const MACH_HEADER_SIZE: usize = 28;
const MACH_HEADER_64_SIZE: usize = 32;
const NCMDS_OFFSET: usize = 16;
const LOAD_COMMAND_SIZE: usize = 8;
const NLIST_SIZE: usize = 12;
const NLIST_64_SIZE: usize = 16;

/// One architecture image inside a (possibly universal) Mach-O file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchSlice {
    /// Byte offset of the slice's mach header in the file.
    pub offset: usize,
    pub is_64: bool,
}

#[derive(Debug, Clone, Copy)]
struct SymtabCommand {
    symoff: usize,
    nsyms: usize,
    stroff: usize,
    strsize: usize,
}

pub struct MachOReader;

impl ExportReader for MachOReader {
    const FORMAT: BinaryFormat = BinaryFormat::MachO;

    fn read_exports(bytes: &[u8], probe: &dyn SymbolProbe) -> Result<Vec<RawExport>> {
        let mut exports = Vec::new();
        let mut seen = HashMap::new();
        for slice in arch_slices(bytes)? {
            let names = slice_symbol_names(bytes, slice)?;
            debug!(
                "Mach-O slice at 0x{:x} ({}-bit): {} symbols",
                slice.offset,
                if slice.is_64 { 64 } else { 32 },
                names.len()
            );
            for name in &names {
                push_export(&mut exports, &mut seen, name, probe);
            }
        }
        Ok(exports)
    }
}

pub(crate) fn is_macho_magic(head: [u8; 4]) -> bool {
    let be = u32::from_be_bytes(head);
    let le = u32::from_le_bytes(head);
    be == FAT_MAGIC || be == FAT_MAGIC_64 || thin_magic(le).is_some()
}

/// Width and byte order announced by a thin mach header magic (read little-endian).
fn thin_magic(magic: u32) -> Option<(bool, Endian)> {
    match magic {
        MH_MAGIC => Some((false, Endian::Little)),
        MH_CIGAM => Some((false, Endian::Big)),
        MH_MAGIC_64 => Some((true, Endian::Little)),
        MH_CIGAM_64 => Some((true, Endian::Big)),
        _ => None,
    }
}

fn thin_header(bytes: &[u8], offset: usize) -> Result<(bool, Endian)> {
    let magic: u32 = bytes
        .pread_with(offset, Endian::Little)
        .map_err(|_| Error::format(format!("no mach header at offset 0x{offset:x}")))?;
    thin_magic(magic)
        .ok_or_else(|| Error::format(format!("unsupported file format (magic 0x{magic:08x})")))
}

/// List the architecture slices of a Mach-O file.
///
/// A thin file is a single slice at offset 0. FAT headers are always
/// big-endian on disk.
pub fn arch_slices(bytes: &[u8]) -> Result<Vec<ArchSlice>> {
    let magic: u32 = bytes
        .pread_with(0, Endian::Big)
        .map_err(|_| Error::format("file too small to hold a magic number"))?;
    if magic != FAT_MAGIC && magic != FAT_MAGIC_64 {
        let (is_64, _) = thin_header(bytes, 0)?;
        return Ok(vec![ArchSlice { offset: 0, is_64 }]);
    }

    let wide = magic == FAT_MAGIC_64;
    let nfat_arch: u32 = bytes.pread_with(4, Endian::Big)?;
    let entry_size = if wide { FAT_ARCH_64_SIZE } else { FAT_ARCH_SIZE };
    let mut slices = Vec::new();
    for i in 0..nfat_arch as usize {
        let mut cursor = FAT_HEADER_SIZE + i * entry_size;
        let cputype: u32 = bytes.gread_with(&mut cursor, Endian::Big)?;
        let _cpusubtype: u32 = bytes.gread_with(&mut cursor, Endian::Big)?;
        let offset = if wide {
            bytes.gread_with::<u64>(&mut cursor, Endian::Big)?
        } else {
            u64::from(bytes.gread_with::<u32>(&mut cursor, Endian::Big)?)
        };
        let offset = usize::try_from(offset)
            .map_err(|_| Error::format(format!("fat arch {i} offset 0x{offset:x} out of range")))?;

        let is_64 = cputype & CPU_ARCH_ABI64 != 0;
        let (header_is_64, _) = thin_header(bytes, offset)?;
        if header_is_64 != is_64 {
            return Err(Error::format(format!(
                "fat arch {i} declares a {}-bit cpu but its mach header is {}-bit",
                if is_64 { 64 } else { 32 },
                if header_is_64 { 64 } else { 32 },
            )));
        }
        slices.push(ArchSlice { offset, is_64 });
    }
    Ok(slices)
}

/// Walk the load commands of one slice and collect its defined symbol names.
pub fn slice_symbol_names(bytes: &[u8], slice: ArchSlice) -> Result<Vec<String>> {
    let (_, endian) = thin_header(bytes, slice.offset)?;
    let ncmds: u32 = bytes.pread_with(slice.offset + NCMDS_OFFSET, endian)?;
    let mut cursor =
        slice.offset + if slice.is_64 { MACH_HEADER_64_SIZE } else { MACH_HEADER_SIZE };

    let mut names = Vec::new();
    for _ in 0..ncmds {
        let cmd: u32 = bytes.pread_with(cursor, endian)?;
        let cmdsize = bytes.pread_with::<u32>(cursor + 4, endian)? as usize;
        if cmdsize < LOAD_COMMAND_SIZE {
            return Err(Error::format(format!(
                "load command at offset 0x{cursor:x} has invalid size {cmdsize}"
            )));
        }
        if cmd == LC_SYMTAB {
            let symtab = SymtabCommand {
                symoff: bytes.pread_with::<u32>(cursor + 8, endian)? as usize,
                nsyms: bytes.pread_with::<u32>(cursor + 12, endian)? as usize,
                stroff: bytes.pread_with::<u32>(cursor + 16, endian)? as usize,
                strsize: bytes.pread_with::<u32>(cursor + 20, endian)? as usize,
            };
            read_symtab(bytes, slice, endian, symtab, &mut names)?;
        }
        cursor = cursor
            .checked_add(cmdsize)
            .ok_or_else(|| Error::format("load commands overflow the address space"))?;
    }
    Ok(names)
}

fn read_symtab(
    bytes: &[u8],
    slice: ArchSlice,
    endian: Endian,
    symtab: SymtabCommand,
    names: &mut Vec<String>,
) -> Result<()> {
    let entry_size = if slice.is_64 { NLIST_64_SIZE } else { NLIST_SIZE };
    let symbols_len = symtab
        .nsyms
        .checked_mul(entry_size)
        .ok_or_else(|| Error::format("symbol table size overflows"))?;
    let symbols = table(bytes, slice.offset + symtab.symoff, symbols_len, "symbol table")?;
    let strtab = table(bytes, slice.offset + symtab.stroff, symtab.strsize, "string table")?;

    for i in 0..symtab.nsyms {
        let mut cursor = i * entry_size;
        let strx = symbols.gread_with::<u32>(&mut cursor, endian)? as usize;
        let n_type: u8 = symbols.gread_with(&mut cursor, endian)?;
        // Debug entries, imports and file-local statics are not exports.
        if n_type & N_STAB != 0 || n_type & N_TYPE == N_UNDF || n_type & N_EXT == 0 {
            continue;
        }
        if strx >= strtab.len() {
            return Err(Error::format(format!(
                "symbol {i} names string index {strx} past the string table ({} bytes)",
                strtab.len()
            )));
        }
        let name = c_str_at(strtab, strx);
        let name = name.strip_prefix('_').unwrap_or(&name);
        if name.is_empty() {
            trace!("skipping unnamed Mach-O symbol {i}");
            continue;
        }
        names.push(name.to_string());
    }
    Ok(())
}

fn table<'a>(bytes: &'a [u8], offset: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    offset
        .checked_add(len)
        .and_then(|end| bytes.get(offset..end))
        .ok_or_else(|| {
            Error::format(format!(
                "{what} at offset 0x{offset:x} ({len} bytes) runs past the end of the file"
            ))
        })
}

fn c_str_at(strtab: &[u8], start: usize) -> String {
    let tail = &strtab[start..];
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    String::from_utf8_lossy(&tail[..end]).into_owned()
}
