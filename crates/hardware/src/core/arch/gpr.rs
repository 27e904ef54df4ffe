//! RISC-V General-Purpose Register File.
//!
//! This module implements the integer register file together with the program counter.
//! It performs the following:
//! 1. **Storage:** Maintains 32 integer registers (`x0`-`x31`) with their ABI names.
//! 2. **Invariant Enforcement:** Register `x0` (`zero`) is read-only and always reads zero.
//! 3. **Program Counter:** A numberless register advanced by an arbitrary byte offset so
//!    variable-length encodings are supported.
//! 4. **Reset Seeding:** `sp`, `gp`, and `pc` reset to addresses taken from the active
//!    [`AddressLayout`].
//! 5. **Backstep Hooks:** Program-visible writes report the previous value to an
//!    [`UndoRecorder`].

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::block::RegisterBlock;
use super::register::Register;
use crate::common::{AccessType, RegisterObserver, SubscriptionId};
use crate::soc::memory::layout::AddressLayout;
use crate::sim::undo::{RegisterFileKind, UndoRecorder};

/// ABI names of `x0`-`x31`.
pub const ABI_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Index of the stack pointer.
pub const STACK_POINTER: usize = 2;

/// Index of the global pointer.
pub const GLOBAL_POINTER: usize = 3;

/// Number of the program counter register.
pub const PROGRAM_COUNTER_NUMBER: i32 = -1;

/// General-purpose register file and program counter.
#[derive(Clone)]
pub struct RegisterFile {
    block: RegisterBlock,
    pc: Register,
    undo: Option<Arc<dyn UndoRecorder>>,
}

impl RegisterFile {
    /// Creates a register file seeded from `layout`.
    ///
    /// # Arguments
    ///
    /// * `layout` - Supplies the reset values of `sp`, `gp`, and `pc`.
    pub fn new(layout: &AddressLayout) -> Self {
        let registers = ABI_NAMES
            .iter()
            .zip(0..)
            .map(|(&name, number)| match number {
                0 => Register::read_only(name, number, 0),
                2 => Register::new(name, number, u64::from(layout.stack_pointer)),
                3 => Register::new(name, number, u64::from(layout.global_pointer)),
                _ => Register::new(name, number, 0),
            })
            .collect();
        Self {
            block: RegisterBlock::new(Some('x'), registers),
            pc: Register::new("pc", PROGRAM_COUNTER_NUMBER, u64::from(layout.text_base)),
            undo: None,
        }
    }

    /// Installs (or removes) the backstep recorder.
    pub fn set_undo_recorder(&mut self, recorder: Option<Arc<dyn UndoRecorder>>) {
        self.undo = recorder;
    }

    /// Reads register `idx` and notifies its observers.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not below 32.
    pub fn read(&self, idx: usize) -> u64 {
        self.block.read(idx)
    }

    /// Reads register `idx` without notifying observers.
    pub fn read_silent(&self, idx: usize) -> u64 {
        self.block.peek(idx)
    }

    /// Writes register `idx` as an instruction would.
    ///
    /// Writes to `x0` are discarded and not recorded.
    ///
    /// # Returns
    ///
    /// The previous value.
    pub fn write(&mut self, idx: usize, value: u64) -> u64 {
        let old = self.block.write(idx, value);
        if idx != 0 {
            if let Some(undo) = &self.undo {
                undo.register_written(RegisterFileKind::General, idx as i32, old);
            }
        }
        old
    }

    /// Writes register `idx` without notification or undo recording.
    pub fn backdoor_write(&mut self, idx: usize, value: u64) -> u64 {
        if idx == 0 {
            return 0;
        }
        self.block.write_backdoor(idx, value)
    }

    /// Resolves an ABI name (`sp`) or numbered name (`x2`) to an index.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.block.index_of_name(name)
    }

    /// Reads a register by name.
    pub fn read_by_name(&self, name: &str) -> Option<u64> {
        self.index_of(name).map(|idx| self.read(idx))
    }

    /// Writes a register by name; returns the previous value.
    pub fn write_by_name(&mut self, name: &str, value: u64) -> Option<u64> {
        let idx = self.index_of(name)?;
        Some(self.write(idx, value))
    }

    /// ABI name of register `idx`.
    pub fn name_of(&self, idx: usize) -> Option<&'static str> {
        self.block.get(idx).map(Register::name)
    }

    /// Current program counter.
    pub fn program_counter(&self) -> u32 {
        self.pc.stored_value() as u32
    }

    /// Sets the program counter as a jump or branch would, recording the old value.
    ///
    /// # Returns
    ///
    /// The previous program counter.
    pub fn set_program_counter(&mut self, value: u32) -> u32 {
        let old = self.program_counter();
        self.pc.value = u64::from(value);
        self.pc.notify(AccessType::Write);
        if let Some(undo) = &self.undo {
            undo.program_counter_written(old);
        }
        old
    }

    /// Advances the program counter by `bytes`.
    pub fn increment_pc(&mut self, bytes: u32) {
        self.pc.value = u64::from(self.program_counter().wrapping_add(bytes));
        self.pc.notify(AccessType::Write);
    }

    /// Places the program counter at `value` before a run, without undo recording.
    pub fn initialize_program_counter(&mut self, value: u32) {
        self.pc.value = u64::from(value);
    }

    /// Reset value of the program counter.
    pub fn initial_program_counter(&self) -> u32 {
        self.pc.reset_value() as u32
    }

    /// Re-seeds the reset values of `sp`, `gp`, and `pc` from `layout`.
    ///
    /// Current values are untouched until the next [`RegisterFile::reset`].
    pub fn change_reset_values(&mut self, layout: &AddressLayout) {
        self.block
            .change_reset_value(STACK_POINTER, u64::from(layout.stack_pointer));
        self.block
            .change_reset_value(GLOBAL_POINTER, u64::from(layout.global_pointer));
        self.pc.change_reset_value(u64::from(layout.text_base));
        debug!(
            sp = layout.stack_pointer,
            gp = layout.global_pointer,
            pc = layout.text_base,
            "register reset values changed"
        );
    }

    /// Restores every register and the program counter to their reset values.
    pub fn reset(&mut self) {
        self.block.reset_all();
        self.pc.reset();
    }

    /// Subscribes to register `idx`.
    pub fn subscribe(
        &mut self,
        idx: usize,
        observer: Arc<dyn RegisterObserver>,
    ) -> Option<SubscriptionId> {
        self.block.subscribe(idx, observer)
    }

    /// Subscribes to every integer register.
    pub fn subscribe_all(&mut self, observer: Arc<dyn RegisterObserver>) -> SubscriptionId {
        self.block.subscribe_all(observer)
    }

    /// Subscribes to program counter writes.
    pub fn subscribe_program_counter(
        &mut self,
        observer: Arc<dyn RegisterObserver>,
    ) -> SubscriptionId {
        self.pc.subscribe(observer)
    }

    /// Removes a subscription from the integer registers and the program counter.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let in_block = self.block.unsubscribe(id);
        self.pc.unsubscribe(id) || in_block
    }

    /// Iterates over `x0`-`x31`.
    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.block.iter()
    }
}

impl fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterFile")
            .field("pc", &format_args!("{:#010x}", self.program_counter()))
            .field("registers", &self.block)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pair in self.block.iter().collect::<Vec<_>>().chunks(2) {
            for register in pair {
                write!(
                    f,
                    "{:<5}(x{:<2}) = {:#010x}  ",
                    register.name(),
                    register.number(),
                    register.stored_value()
                )?;
            }
            writeln!(f)?;
        }
        writeln!(f, "pc          = {:#010x}", self.program_counter())
    }
}
