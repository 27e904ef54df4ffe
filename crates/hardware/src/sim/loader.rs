//! Program Loader.
//!
//! This module places programs into a [`MachineState`]. It performs:
//! 1. **Text loading:** Decodes instruction words and stores them as statements.
//! 2. **Data loading:** Copies initialized bytes into the data segment.
//! 3. **ELF loading:** Loads the `PT_LOAD` segments of a 32-bit little-endian RISC-V ELF
//!    image, finds `main`, and places the program counter.

use std::sync::Arc;

use object::read::elf::ElfFile32;
use object::{Architecture, Object, ObjectSegment, ObjectSymbol};
use thiserror::Error;
use tracing::debug;

use crate::common::Exception;
use crate::common::constants::{BYTE_LENGTH_BYTES, WORD_LENGTH_BYTES};
use crate::core::state::MachineState;

/// Failures while loading a program.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The image could not be parsed.
    #[error("invalid ELF image: {0}")]
    Elf(#[from] object::Error),

    /// The image is valid but not for this machine.
    #[error("unsupported ELF image: {0}")]
    Unsupported(&'static str),

    /// Part of the program does not fit the active layout.
    #[error("could not place program: {0}")]
    Memory(#[from] Exception),
}

/// Addresses discovered while loading an ELF image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadedProgram {
    /// ELF entry point.
    pub entry: u32,
    /// Address of the `main` symbol, if present.
    pub main: Option<u32>,
    /// Where the program counter was placed.
    pub start: u32,
}

/// Stores instruction words as statements starting at `base`.
///
/// # Returns
///
/// The address just past the last instruction.
///
/// # Errors
///
/// Fails if a word cannot be decoded or lies outside the text segment.
pub fn load_text(state: &mut MachineState, base: u32, words: &[u32]) -> Result<u32, LoadError> {
    let decoder = Arc::clone(state.memory().decoder());
    let mut address = base;
    for &word in words {
        let statement = decoder.decode(word, address)?;
        state.memory_mut().set_statement(address, statement)?;
        address = address.wrapping_add(WORD_LENGTH_BYTES);
    }
    debug!(base, end = address, "text loaded");
    Ok(address)
}

/// Copies `bytes` into memory starting at `base`.
///
/// Loader writes are not recorded for backstepping.
///
/// # Errors
///
/// Fails if any byte lies outside writable memory.
pub fn load_data(state: &mut MachineState, base: u32, bytes: &[u8]) -> Result<(), LoadError> {
    let memory = state.memory_mut();
    for (address, &byte) in (base..).zip(bytes) {
        let _ = memory.set(address, u64::from(byte), BYTE_LENGTH_BYTES)?;
    }
    debug!(base, len = bytes.len(), "data loaded");
    Ok(())
}

/// Loads a 32-bit RISC-V ELF executable.
///
/// Segments starting in the text segment are stored as statements; all others are copied
/// as bytes. The program counter is placed at `main` when starting at main is enabled and
/// the symbol lies in the text segment, otherwise at the entry point.
///
/// # Errors
///
/// Fails for malformed images, images for another architecture, and segments that do not
/// fit the active layout.
pub fn load_elf(state: &mut MachineState, image: &[u8]) -> Result<LoadedProgram, LoadError> {
    let file = ElfFile32::<object::Endianness>::parse(image)?;
    if !file.is_little_endian() {
        return Err(LoadError::Unsupported("big-endian image"));
    }
    if file.architecture() != Architecture::Riscv32 {
        return Err(LoadError::Unsupported("not a RV32 image"));
    }

    for segment in file.segments() {
        let address = segment.address() as u32;
        let data = segment.data()?;
        if data.is_empty() {
            continue;
        }
        if state.memory().in_text_segment(address) {
            let words: Vec<u32> = data
                .chunks(WORD_LENGTH_BYTES as usize)
                .map(|chunk| {
                    let mut word = [0u8; 4];
                    word[..chunk.len()].copy_from_slice(chunk);
                    u32::from_le_bytes(word)
                })
                .collect();
            let _ = load_text(state, address, &words)?;
        } else {
            load_data(state, address, data)?;
        }
    }

    let entry = file.entry() as u32;
    let main = file
        .symbols()
        .find(|symbol| symbol.name().is_ok_and(|name| name == "main"))
        .map(|symbol| symbol.address() as u32);
    let start = match main {
        Some(address)
            if state.config().registers.start_at_main
                && state.memory().in_text_segment(address) =>
        {
            address
        }
        _ => entry,
    };
    state.registers_mut().initialize_program_counter(start);
    debug!(entry, ?main, start, "ELF image loaded");
    Ok(LoadedProgram { entry, main, start })
}
