//! RISC-V Floating-Point Register File.
//!
//! This module implements the floating-point register file (`f0`-`f31`). Registers are 64
//! bits wide. Single-precision values are NaN-boxed: stored with the upper 32 bits all set.
//! A single-precision read of a register that is not a valid NaN-box returns the canonical
//! quiet NaN instead of the low bits.

use std::fmt;
use std::sync::Arc;

use super::block::RegisterBlock;
use super::register::Register;
use crate::common::constants::{CANONICAL_NAN_F32, NAN_BOX_MASK};
use crate::common::{RegisterObserver, SubscriptionId};
use crate::sim::undo::{RegisterFileKind, UndoRecorder};

/// ABI names of `f0`-`f31`.
pub const ABI_NAMES: [&str; 32] = [
    "ft0", "ft1", "ft2", "ft3", "ft4", "ft5", "ft6", "ft7", "fs0", "fs1", "fa0", "fa1", "fa2",
    "fa3", "fa4", "fa5", "fa6", "fa7", "fs2", "fs3", "fs4", "fs5", "fs6", "fs7", "fs8", "fs9",
    "fs10", "fs11", "ft8", "ft9", "ft10", "ft11",
];

/// Floating-point register file.
#[derive(Clone)]
pub struct FloatingPointRegisterFile {
    block: RegisterBlock,
    undo: Option<Arc<dyn UndoRecorder>>,
}

impl FloatingPointRegisterFile {
    /// Creates a file with every register zeroed.
    pub fn new() -> Self {
        let registers = ABI_NAMES
            .iter()
            .zip(0..)
            .map(|(&name, number)| Register::new(name, number, 0))
            .collect();
        Self {
            block: RegisterBlock::new(Some('f'), registers),
            undo: None,
        }
    }

    /// Installs (or removes) the backstep recorder.
    pub fn set_undo_recorder(&mut self, recorder: Option<Arc<dyn UndoRecorder>>) {
        self.undo = recorder;
    }

    /// Reads the single-precision bits of register `idx`.
    ///
    /// # Returns
    ///
    /// The low 32 bits if the register holds a valid NaN-box, otherwise `0x7FC00000`.
    pub fn read_word(&self, idx: usize) -> u32 {
        unbox(self.block.read(idx))
    }

    /// Writes single-precision bits into register `idx`, NaN-boxing them.
    ///
    /// # Returns
    ///
    /// The previous 64-bit contents.
    pub fn write_word(&mut self, idx: usize, bits: u32) -> u64 {
        self.write_double(idx, NAN_BOX_MASK | u64::from(bits))
    }

    /// Reads the full 64 bits of register `idx`.
    pub fn read_double(&self, idx: usize) -> u64 {
        self.block.read(idx)
    }

    /// Writes the full 64 bits of register `idx`.
    ///
    /// # Returns
    ///
    /// The previous contents.
    pub fn write_double(&mut self, idx: usize, bits: u64) -> u64 {
        let old = self.block.write(idx, bits);
        if let Some(undo) = &self.undo {
            undo.register_written(RegisterFileKind::FloatingPoint, idx as i32, old);
        }
        old
    }

    /// Reads register `idx` as an `f32`.
    pub fn read_f32(&self, idx: usize) -> f32 {
        f32::from_bits(self.read_word(idx))
    }

    /// Writes an `f32` into register `idx`.
    pub fn write_f32(&mut self, idx: usize, value: f32) -> u64 {
        self.write_word(idx, value.to_bits())
    }

    /// Reads register `idx` as an `f64`.
    pub fn read_f64(&self, idx: usize) -> f64 {
        f64::from_bits(self.read_double(idx))
    }

    /// Writes an `f64` into register `idx`.
    pub fn write_f64(&mut self, idx: usize, value: f64) -> u64 {
        self.write_double(idx, value.to_bits())
    }

    /// Reads register `idx` without notifying observers.
    pub fn read_silent(&self, idx: usize) -> u64 {
        self.block.peek(idx)
    }

    /// Writes the 64 bits of register `idx` without notification or undo recording.
    pub fn backdoor_write(&mut self, idx: usize, bits: u64) -> u64 {
        self.block.write_backdoor(idx, bits)
    }

    /// Resolves an ABI name (`fa0`) or numbered name (`f10`) to an index.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.block.index_of_name(name)
    }

    /// Reads the single-precision bits of a register by name.
    pub fn read_word_by_name(&self, name: &str) -> Option<u32> {
        self.index_of(name).map(|idx| self.read_word(idx))
    }

    /// Writes single-precision bits into a register by name.
    pub fn write_word_by_name(&mut self, name: &str, bits: u32) -> Option<u64> {
        let idx = self.index_of(name)?;
        Some(self.write_word(idx, bits))
    }

    /// Restores every register to zero.
    pub fn reset(&mut self) {
        self.block.reset_all();
    }

    /// Subscribes to register `idx`.
    pub fn subscribe(
        &mut self,
        idx: usize,
        observer: Arc<dyn RegisterObserver>,
    ) -> Option<SubscriptionId> {
        self.block.subscribe(idx, observer)
    }

    /// Subscribes to every floating-point register.
    pub fn subscribe_all(&mut self, observer: Arc<dyn RegisterObserver>) -> SubscriptionId {
        self.block.subscribe_all(observer)
    }

    /// Removes a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.block.unsubscribe(id)
    }

    /// Iterates over `f0`-`f31`.
    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.block.iter()
    }
}

impl Default for FloatingPointRegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FloatingPointRegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FloatingPointRegisterFile")
            .field("registers", &self.block)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for FloatingPointRegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for register in &self.block {
            let bits = register.stored_value();
            writeln!(
                f,
                "{:<5}(f{:<2}) = {:#018x}  {}",
                register.name(),
                register.number(),
                bits,
                f32::from_bits(unbox(bits))
            )?;
        }
        Ok(())
    }
}

const fn unbox(bits: u64) -> u32 {
    if bits & NAN_BOX_MASK == NAN_BOX_MASK {
        bits as u32
    } else {
        CANONICAL_NAN_F32
    }
}
