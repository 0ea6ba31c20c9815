use object::write::{Mangling, Object, Symbol, SymbolSection};
use object::{Architecture, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};

use libsym_core::catalog::{build_catalog, build_catalog_for};
use libsym_core::reader::{
    detect_format, BinaryFormat, ElfReader, ExportReader, MachOReader, PeReader, Unloaded,
};
use libsym_core::{Error, SymbolKind as RecordKind};

fn add_symbol(
    obj: &mut Object<'_>,
    name: &str,
    kind: SymbolKind,
    scope: SymbolScope,
    section: SymbolSection,
) {
    obj.add_symbol(Symbol {
        name: name.as_bytes().to_vec(),
        value: 0,
        size: 0,
        kind,
        scope,
        weak: false,
        section,
        flags: SymbolFlags::None,
    });
}

fn elf_fixture() -> Vec<u8> {
    let mut obj = Object::new(object::BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let text = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    obj.section_mut(text).append_data(&[0xC3; 16], 16);
    let data = obj.add_section(Vec::new(), b".data".to_vec(), SectionKind::Data);
    obj.section_mut(data).append_data(&1.5f64.to_le_bytes(), 8);

    let in_text = SymbolSection::Section(text);
    add_symbol(&mut obj, "adder", SymbolKind::Text, SymbolScope::Linkage, in_text);
    add_symbol(&mut obj, "_ZN5tools5adderEdd", SymbolKind::Text, SymbolScope::Linkage, in_text);
    add_symbol(&mut obj, "helper", SymbolKind::Text, SymbolScope::Compilation, in_text);
    let in_data = SymbolSection::Section(data);
    add_symbol(&mut obj, "pi_value", SymbolKind::Data, SymbolScope::Linkage, in_data);
    add_symbol(&mut obj, "puts", SymbolKind::Text, SymbolScope::Linkage, SymbolSection::Undefined);
    obj.write().unwrap()
}

fn macho_fixture(arch: Architecture, names: &[&str]) -> Vec<u8> {
    let mut obj = Object::new(object::BinaryFormat::MachO, arch, Endianness::Little);
    obj.set_mangling(Mangling::None);
    let text = obj.add_section(Vec::new(), b"__TEXT,__text".to_vec(), SectionKind::Text);
    obj.section_mut(text).append_data(&[0u8; 16], 4);
    for name in names {
        let in_text = SymbolSection::Section(text);
        add_symbol(&mut obj, name, SymbolKind::Text, SymbolScope::Linkage, in_text);
    }
    let undefined = SymbolSection::Undefined;
    add_symbol(&mut obj, "_dlopen", SymbolKind::Text, SymbolScope::Linkage, undefined);
    obj.write().unwrap()
}

/// Universal binary with slices 4 KiB aligned, like `lipo` writes them.
fn fat_fixture(slices: &[(u32, &[u8])]) -> Vec<u8> {
    const ALIGN: usize = 0x1000;
    let mut out = Vec::new();
    out.extend_from_slice(&0xcafe_babe_u32.to_be_bytes());
    out.extend_from_slice(&(slices.len() as u32).to_be_bytes());

    let mut offset = ALIGN;
    let mut placed = Vec::new();
    for (cputype, image) in slices {
        out.extend_from_slice(&cputype.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&(image.len() as u32).to_be_bytes());
        out.extend_from_slice(&12u32.to_be_bytes());
        placed.push(offset);
        offset += image.len().div_ceil(ALIGN) * ALIGN;
    }
    out.resize(offset, 0);
    for ((_, image), at) in slices.iter().zip(placed) {
        out[at..at + image.len()].copy_from_slice(image);
    }
    out
}

const CPU_TYPE_X86_64: u32 = 0x0100_0007;
const CPU_TYPE_ARM64: u32 = 0x0100_000c;

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

/// Minimal PE32+ DLL: headers in the first 0x200 bytes, one `.edata`
/// section mapped at RVA 0x1000 from file offset 0x200.
fn pe_fixture(with_exports: bool) -> Vec<u8> {
    const SECTION_RVA: u32 = 0x1000;
    const SECTION_RAW: usize = 0x200;
    let rva_to_file = |rva: u32| SECTION_RAW + (rva - SECTION_RVA) as usize;

    let mut pe = vec![0u8; 0x400];
    pe[0..2].copy_from_slice(b"MZ");
    put_u32(&mut pe, 0x3c, 0x40);
    pe[0x40..0x44].copy_from_slice(b"PE\0\0");

    // COFF header
    put_u16(&mut pe, 0x44, 0x8664);
    put_u16(&mut pe, 0x46, 1);
    put_u16(&mut pe, 0x54, 240);
    put_u16(&mut pe, 0x56, 0x2022);

    // Optional header (PE32+)
    let opt = 0x58;
    put_u16(&mut pe, opt, 0x20b);
    pe[opt + 24..opt + 32].copy_from_slice(&0x1_8000_0000u64.to_le_bytes());
    put_u32(&mut pe, opt + 32, 0x1000);
    put_u32(&mut pe, opt + 36, 0x200);
    put_u16(&mut pe, opt + 40, 6);
    put_u16(&mut pe, opt + 48, 6);
    put_u32(&mut pe, opt + 56, 0x2000);
    put_u32(&mut pe, opt + 60, 0x200);
    put_u16(&mut pe, opt + 68, 2);
    put_u32(&mut pe, opt + 108, 16);
    if with_exports {
        put_u32(&mut pe, opt + 112, SECTION_RVA);
        put_u32(&mut pe, opt + 116, 0x100);
    }

    // Section table
    let sec = opt + 240;
    pe[sec..sec + 6].copy_from_slice(b".edata");
    put_u32(&mut pe, sec + 8, 0x200);
    put_u32(&mut pe, sec + 12, SECTION_RVA);
    put_u32(&mut pe, sec + 16, 0x200);
    put_u32(&mut pe, sec + 20, SECTION_RAW as u32);
    put_u32(&mut pe, sec + 36, 0x4000_0040);

    if !with_exports {
        return pe;
    }

    let names = ["_ZN5tools5adderEdd", "adder", "pi_value"];
    let (eat, npt, ot, dll_name) = (0x1028u32, 0x1040u32, 0x1050u32, 0x1060u32);
    let dir = rva_to_file(SECTION_RVA);
    put_u32(&mut pe, dir + 12, dll_name);
    put_u32(&mut pe, dir + 16, 1);
    put_u32(&mut pe, dir + 20, names.len() as u32);
    put_u32(&mut pe, dir + 24, names.len() as u32);
    put_u32(&mut pe, dir + 28, eat);
    put_u32(&mut pe, dir + 32, npt);
    put_u32(&mut pe, dir + 36, ot);

    let dll = rva_to_file(dll_name);
    pe[dll..dll + 9].copy_from_slice(b"tools.dll");

    let mut string_rva = 0x1080u32;
    for (i, name) in names.iter().enumerate() {
        // Function RVAs sit past the export directory so none reads as a forwarder.
        put_u32(&mut pe, rva_to_file(eat) + 4 * i, 0x1180 + 0x10 * i as u32);
        put_u32(&mut pe, rva_to_file(npt) + 4 * i, string_rva);
        put_u16(&mut pe, rva_to_file(ot) + 2 * i, i as u16);
        let at = rva_to_file(string_rva);
        pe[at..at + name.len()].copy_from_slice(name.as_bytes());
        string_rva += 0x20;
    }
    pe
}

#[test]
fn elf_reader_keeps_defined_global_functions_and_objects() {
    let bytes = elf_fixture();
    assert_eq!(detect_format(&bytes), Some(BinaryFormat::Elf));

    let exports = ElfReader::read_exports(&bytes, &|name: &str| name == "adder").unwrap();
    let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"adder"));
    assert!(names.contains(&"_ZN5tools5adderEdd"));
    assert!(names.contains(&"pi_value"));
    assert!(!names.contains(&"helper"), "local symbol leaked: {names:?}");
    assert!(!names.contains(&"puts"), "undefined symbol leaked: {names:?}");

    let adder = exports.iter().find(|e| e.name == "adder").unwrap();
    assert!(adder.loadable);
    assert!(exports.iter().filter(|e| e.name != "adder").all(|e| !e.loadable));
}

#[test]
fn elf_catalog_demangles_cpp_symbols() {
    let bytes = elf_fixture();
    let records = build_catalog::<ElfReader>(&bytes, &Unloaded).unwrap();
    let cpp = records.iter().find(|r| r.name == "_ZN5tools5adderEdd").unwrap();
    assert_eq!(cpp.kind, RecordKind::Cpp);
    assert_eq!(cpp.demangled_name, "tools::adder(double, double)");

    let c = records.iter().find(|r| r.name == "pi_value").unwrap();
    assert_eq!(c.kind, RecordKind::C);
    assert_eq!(c.demangled_name, "pi_value");
}

#[test]
fn elf_reader_rejects_garbage() {
    let err = ElfReader::read_exports(b"\x7fELF not really", &Unloaded).unwrap_err();
    assert!(matches!(err, Error::Format(_)), "unexpected: {err}");
}

#[test]
fn macho_reader_strips_leading_underscore_and_skips_undefined() {
    let bytes = macho_fixture(Architecture::X86_64, &["_adder", "__ZN5tools5adderEv"]);
    assert_eq!(detect_format(&bytes), Some(BinaryFormat::MachO));

    let exports = MachOReader::read_exports(&bytes, &Unloaded).unwrap();
    let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"adder"), "{names:?}");
    assert!(names.contains(&"_ZN5tools5adderEv"), "{names:?}");
    assert!(!names.contains(&"dlopen"), "{names:?}");
}

#[test]
fn fat_binary_merges_slices_without_duplicates() {
    let intel = macho_fixture(Architecture::X86_64, &["_shared", "_only_intel"]);
    let arm = macho_fixture(Architecture::Aarch64, &["_shared", "_only_arm"]);
    let fat = fat_fixture(&[(CPU_TYPE_X86_64, &intel), (CPU_TYPE_ARM64, &arm)]);
    assert_eq!(detect_format(&fat), Some(BinaryFormat::MachO));

    let exports = MachOReader::read_exports(&fat, &|name: &str| name == "only_arm").unwrap();
    let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names.iter().filter(|n| **n == "shared").count(), 1, "{names:?}");
    // Slices are walked in header order; a name seen again keeps its first position.
    assert_eq!(names.len(), 3, "{names:?}");
    assert_eq!(names.last(), Some(&"only_arm"), "{names:?}");
    assert!(exports.iter().find(|e| e.name == "only_arm").unwrap().loadable);
    assert!(!exports.iter().find(|e| e.name == "shared").unwrap().loadable);
}

#[test]
fn fat_slice_width_must_match_its_header() {
    let intel = macho_fixture(Architecture::X86_64, &["_shared"]);
    // 32-bit i386 cputype in front of a 64-bit slice.
    let fat = fat_fixture(&[(0x0000_0007, &intel)]);
    let err = MachOReader::read_exports(&fat, &Unloaded).unwrap_err();
    assert!(matches!(err, Error::Format(_)), "unexpected: {err}");
}

#[test]
fn pe_reader_lists_named_exports() {
    let bytes = pe_fixture(true);
    assert_eq!(detect_format(&bytes), Some(BinaryFormat::Pe));

    let exports = PeReader::read_exports(&bytes, &|name: &str| name.starts_with('_')).unwrap();
    let names: Vec<&str> = exports.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["_ZN5tools5adderEdd", "adder", "pi_value"]);
    assert!(exports[0].loadable);
    assert!(!exports[1].loadable);
}

#[test]
fn pe_without_export_directory_is_a_format_error() {
    let err = PeReader::read_exports(&pe_fixture(false), &Unloaded).unwrap_err();
    assert_eq!(err.to_string(), "Invalid binary format: no export directory found");
}

#[test]
fn offline_catalog_dispatches_on_detected_format() {
    for bytes in [elf_fixture(), pe_fixture(true)] {
        let format = detect_format(&bytes).unwrap();
        let records = build_catalog_for(format, &bytes, &Unloaded).unwrap();
        assert!(records.iter().any(|r| r.name == "adder"), "{format}: {records:?}");
        assert!(records.iter().all(|r| !r.loadable));
    }
}
