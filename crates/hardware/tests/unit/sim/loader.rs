//! Program Loader Unit Tests.
//!
//! Verifies text and data placement and loading of a minimal hand-built RV32 ELF image.

use std::sync::Arc;

use riscv_state::common::ExceptionCause;
use riscv_state::sim::loader::{LoadError, LoadedProgram, load_data, load_elf, load_text};
use riscv_state::soc::memory::layout::LayoutPreset;

use crate::common::harness::{ADDI_A0_5, ILLEGAL_ENCODING, NOP, TaggingDecoder, machine};

const TEXT: u32 = 0x0040_0000;
const MAIN: u32 = 0x0040_0008;

const EM_RISCV: u16 = 243;
const EM_X86_64: u16 = 62;

/// Builds a little-endian ELF32 executable with one `PT_LOAD` segment holding `text` at
/// `TEXT` and a symbol table defining `main` at `MAIN`.
fn elf_image(e_machine: u16, text: &[u32]) -> Vec<u8> {
    const EHDR: usize = 52;
    const PHDR: usize = 32;
    const SHDR: usize = 40;

    let text_bytes: Vec<u8> = text.iter().flat_map(|w| w.to_le_bytes()).collect();
    let text_offset = EHDR + PHDR;
    let symtab_offset = text_offset + text_bytes.len();
    let strtab: &[u8] = b"\0main\0";
    let strtab_offset = symtab_offset + 2 * 16;
    let shstrtab: &[u8] = b"\0.symtab\0.strtab\0.shstrtab\0";
    let shstrtab_offset = strtab_offset + strtab.len();
    let shoff = (shstrtab_offset + shstrtab.len()).next_multiple_of(4);

    let mut out = Vec::new();
    let u16_le = |out: &mut Vec<u8>, v: u16| out.extend_from_slice(&v.to_le_bytes());
    let u32_le = |out: &mut Vec<u8>, v: u32| out.extend_from_slice(&v.to_le_bytes());

    // ELF header.
    out.extend_from_slice(&[0x7f, b'E', b'L', b'F', 1, 1, 1, 0]);
    out.extend_from_slice(&[0; 8]);
    u16_le(&mut out, 2); // ET_EXEC
    u16_le(&mut out, e_machine);
    u32_le(&mut out, 1);
    u32_le(&mut out, TEXT); // entry
    u32_le(&mut out, EHDR as u32); // phoff
    u32_le(&mut out, shoff as u32);
    u32_le(&mut out, 0); // flags
    u16_le(&mut out, EHDR as u16);
    u16_le(&mut out, PHDR as u16);
    u16_le(&mut out, 1);
    u16_le(&mut out, SHDR as u16);
    u16_le(&mut out, 4);
    u16_le(&mut out, 3); // shstrndx

    // PT_LOAD for the text.
    for v in [
        1,
        text_offset as u32,
        TEXT,
        TEXT,
        text_bytes.len() as u32,
        text_bytes.len() as u32,
        5,
        4,
    ] {
        u32_le(&mut out, v);
    }
    out.extend_from_slice(&text_bytes);

    // .symtab: null symbol, then `main` (global function, absolute).
    out.extend_from_slice(&[0; 16]);
    u32_le(&mut out, 1);
    u32_le(&mut out, MAIN);
    u32_le(&mut out, 0);
    out.extend_from_slice(&[0x12, 0]);
    u16_le(&mut out, 0xfff1);

    out.extend_from_slice(strtab);
    out.extend_from_slice(shstrtab);
    out.resize(shoff, 0);

    // Section headers: name, type, flags, addr, offset, size, link, info, align, entsize.
    let sections: [[u32; 10]; 4] = [
        [0; 10],
        [1, 2, 0, 0, symtab_offset as u32, 32, 2, 1, 4, 16],
        [9, 3, 0, 0, strtab_offset as u32, strtab.len() as u32, 0, 0, 1, 0],
        [17, 3, 0, 0, shstrtab_offset as u32, shstrtab.len() as u32, 0, 0, 1, 0],
    ];
    for field in sections.iter().flatten() {
        u32_le(&mut out, *field);
    }
    out
}

// ══════════════════════════════════════════════════════════
// 1. Text and data
// ══════════════════════════════════════════════════════════

#[test]
fn load_text_stores_statements() {
    let mut state = machine(LayoutPreset::Default);
    let end = load_text(&mut state, TEXT, &[ADDI_A0_5, NOP]).unwrap();
    assert_eq!(end, TEXT + 8);

    let memory = state.memory();
    assert_eq!(memory.get_raw_word(TEXT).unwrap(), ADDI_A0_5);
    assert_eq!(memory.get_raw_word(TEXT + 4).unwrap(), NOP);
    assert_eq!(memory.address_of_first_null(TEXT, TEXT + 64).unwrap(), end);
}

#[test]
fn load_text_uses_the_installed_decoder() {
    let mut state = machine(LayoutPreset::Default);
    state.memory_mut().set_decoder(Arc::new(TaggingDecoder));
    let _ = load_text(&mut state, TEXT, &[NOP]).unwrap();
    let statement = state.memory().get_statement(TEXT).unwrap().unwrap();
    assert_eq!(statement.source(), Some("0x00000013"));

    let error = load_text(&mut state, TEXT + 4, &[ILLEGAL_ENCODING]).unwrap_err();
    assert!(matches!(
        error,
        LoadError::Memory(ref e) if e.cause() == Some(ExceptionCause::IllegalInstruction)
    ));
}

#[test]
fn load_text_outside_text_fails() {
    let mut state = machine(LayoutPreset::Default);
    let error = load_text(&mut state, 0x1001_0000, &[NOP]).unwrap_err();
    assert!(matches!(error, LoadError::Memory(_)));
}

#[test]
fn load_data_copies_bytes() {
    let mut state = machine(LayoutPreset::Default);
    load_data(&mut state, 0x1001_0001, b"hello").unwrap();
    let memory = state.memory();
    assert_eq!(memory.get_word(0x1001_0000).unwrap(), 0x6C65_6800);
    assert_eq!(memory.get_byte(0x1001_0005).unwrap(), b'o');
}

#[test]
fn load_data_into_text_fails_without_self_modifying_code() {
    let mut state = machine(LayoutPreset::Default);
    let error = load_data(&mut state, TEXT, &[1, 2]).unwrap_err();
    assert!(matches!(
        error,
        LoadError::Memory(ref e) if e.cause() == Some(ExceptionCause::StoreAccessFault)
    ));
}

// ══════════════════════════════════════════════════════════
// 2. ELF images
// ══════════════════════════════════════════════════════════

#[test]
fn elf_loads_text_and_starts_at_entry() {
    let mut state = machine(LayoutPreset::Default);
    let image = elf_image(EM_RISCV, &[NOP, NOP, ADDI_A0_5]);

    let program = load_elf(&mut state, &image).unwrap();

    assert_eq!(
        program,
        LoadedProgram {
            entry: TEXT,
            main: Some(MAIN),
            start: TEXT,
        }
    );
    assert_eq!(state.registers().program_counter(), TEXT);
    assert_eq!(state.memory().get_raw_word(MAIN).unwrap(), ADDI_A0_5);
}

#[test]
fn elf_starts_at_main_when_enabled() {
    let mut state = machine(LayoutPreset::Default);
    state.set_start_at_main(true);
    let image = elf_image(EM_RISCV, &[NOP, NOP, ADDI_A0_5]);

    let program = load_elf(&mut state, &image).unwrap();

    assert_eq!(program.start, MAIN);
    assert_eq!(state.registers().program_counter(), MAIN);
}

#[test]
fn elf_for_other_architecture_is_rejected() {
    let mut state = machine(LayoutPreset::Default);
    let image = elf_image(EM_X86_64, &[NOP]);
    assert!(matches!(
        load_elf(&mut state, &image),
        Err(LoadError::Unsupported(_))
    ));
    assert_eq!(state.memory().allocated_block_count(), 0);
}

#[test]
fn garbage_is_not_an_elf() {
    let mut state = machine(LayoutPreset::Default);
    assert!(matches!(
        load_elf(&mut state, b"definitely not an ELF file"),
        Err(LoadError::Elf(_))
    ));
}

#[test]
fn elf_that_does_not_fit_the_layout_fails() {
    let mut state = machine(LayoutPreset::CompactTextAtZero);
    let image = elf_image(EM_RISCV, &[NOP]);
    assert!(matches!(
        load_elf(&mut state, &image),
        Err(LoadError::Memory(_))
    ));
}
