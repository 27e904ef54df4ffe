//! Control and Status Register (CSR) definitions and operations.
//!
//! This module implements the user-level CSR file. It provides:
//! 1. **Address Definitions:** Constants for every implemented CSR number.
//! 2. **Field Masks:** The writable bits of `ustatus` and `fcsr`, and the `fflags`/`frm`
//!    windows into `fcsr`.
//! 3. **Register Storage:** `ControlAndStatusRegisterFile`, composed from plain, read-only,
//!    masked, and linked registers.
//! 4. **Counters:** `cycle`, `time`, and `instret` are read-only to programs and advanced by
//!    the simulator through the backdoor. `cycleh`, `timeh`, and `instreth` report the upper
//!    halves and discard writes.

use std::fmt;
use std::sync::Arc;

use super::block::RegisterBlock;
use super::register::{Register, RegisterKind};
use crate::common::{RegisterObserver, SubscriptionId};
use crate::sim::undo::{RegisterFileKind, UndoRecorder};

/// User status register CSR address.
pub const USTATUS: u32 = 0x000;

/// Accrued floating-point exception flags CSR address.
pub const FFLAGS: u32 = 0x001;

/// Floating-point dynamic rounding mode CSR address.
pub const FRM: u32 = 0x002;

/// Floating-point control and status register CSR address.
pub const FCSR: u32 = 0x003;

/// User interrupt enable register CSR address.
pub const UIE: u32 = 0x004;

/// User trap handler base address CSR address.
pub const UTVEC: u32 = 0x005;

/// User scratch register CSR address.
pub const USCRATCH: u32 = 0x040;

/// User exception program counter CSR address.
pub const UEPC: u32 = 0x041;

/// User trap cause CSR address.
pub const UCAUSE: u32 = 0x042;

/// User trap value CSR address.
pub const UTVAL: u32 = 0x043;

/// User interrupt pending register CSR address.
pub const UIP: u32 = 0x044;

/// Cycle counter CSR address.
pub const CYCLE: u32 = 0xC00;

/// Real-time clock CSR address.
pub const TIME: u32 = 0xC01;

/// Instructions-retired counter CSR address.
pub const INSTRET: u32 = 0xC02;

/// Upper half of the cycle counter CSR address.
pub const CYCLEH: u32 = 0xC80;

/// Upper half of the real-time clock CSR address.
pub const TIMEH: u32 = 0xC81;

/// Upper half of the instructions-retired counter CSR address.
pub const INSTRETH: u32 = 0xC82;

/// Writable bits of `ustatus` (UIE and UPIE).
pub const USTATUS_WRITABLE: u64 = 0x11;

/// Writable bits of `fcsr`.
pub const FCSR_WRITABLE: u64 = 0xFF;

/// Bits of `fcsr` exposed as `fflags`.
pub const FFLAGS_MASK: u64 = 0x1F;

/// Bits of `fcsr` exposed as `frm`.
pub const FRM_MASK: u64 = 0xE0;

/// Bits of a counter exposed as its high-word shadow.
pub const HIGH_WORD_MASK: u64 = 0xFFFF_FFFF_0000_0000;

/// The user-level control and status register file.
#[derive(Clone)]
pub struct ControlAndStatusRegisterFile {
    block: RegisterBlock,
    undo: Option<Arc<dyn UndoRecorder>>,
}

impl ControlAndStatusRegisterFile {
    /// Creates the CSR file with every register at its reset value.
    pub fn new() -> Self {
        // Block indices of the parents referenced by linked registers.
        const FCSR_INDEX: usize = 3;
        const CYCLE_INDEX: usize = 11;
        const TIME_INDEX: usize = 12;
        const INSTRET_INDEX: usize = 13;

        let n = |number: u32| number as i32;
        let registers = vec![
            Register::masked("ustatus", n(USTATUS), 0, USTATUS_WRITABLE),
            Register::linked("fflags", n(FFLAGS), FCSR_INDEX, FFLAGS_MASK),
            Register::linked("frm", n(FRM), FCSR_INDEX, FRM_MASK),
            Register::masked("fcsr", n(FCSR), 0, FCSR_WRITABLE),
            Register::new("uie", n(UIE), 0),
            Register::new("utvec", n(UTVEC), 0),
            Register::new("uscratch", n(USCRATCH), 0),
            Register::new("uepc", n(UEPC), 0),
            Register::new("ucause", n(UCAUSE), 0),
            Register::new("utval", n(UTVAL), 0),
            Register::new("uip", n(UIP), 0),
            Register::read_only("cycle", n(CYCLE), 0),
            Register::read_only("time", n(TIME), 0),
            Register::read_only("instret", n(INSTRET), 0),
            Register::linked("cycleh", n(CYCLEH), CYCLE_INDEX, HIGH_WORD_MASK),
            Register::linked("timeh", n(TIMEH), TIME_INDEX, HIGH_WORD_MASK),
            Register::linked("instreth", n(INSTRETH), INSTRET_INDEX, HIGH_WORD_MASK),
        ];
        Self {
            block: RegisterBlock::new(None, registers),
            undo: None,
        }
    }

    /// Installs (or removes) the backstep recorder.
    pub fn set_undo_recorder(&mut self, recorder: Option<Arc<dyn UndoRecorder>>) {
        self.undo = recorder;
    }

    fn index(&self, number: u32) -> Option<usize> {
        self.block.index_of_number(i32::try_from(number).ok()?)
    }

    /// Reads CSR `number` and notifies its observers.
    ///
    /// # Returns
    ///
    /// `None` if no CSR has that number.
    pub fn read(&self, number: u32) -> Option<u64> {
        self.index(number).map(|idx| self.block.read(idx))
    }

    /// Reads CSR `number` without notifying observers.
    pub fn read_silent(&self, number: u32) -> Option<u64> {
        self.index(number).map(|idx| self.block.peek(idx))
    }

    /// Writes CSR `number` as an instruction would.
    ///
    /// Read-only counters and their shadows accept the write and keep their value. The
    /// previous value is reported to the backstep recorder.
    ///
    /// # Returns
    ///
    /// The previous value, or `None` if no CSR has that number.
    pub fn write(&mut self, number: u32, value: u64) -> Option<u64> {
        let idx = self.index(number)?;
        let old = self.block.write(idx, value);
        if let Some(undo) = &self.undo {
            undo.register_written(RegisterFileKind::ControlStatus, number as i32, old);
        }
        Some(old)
    }

    /// Writes CSR `number` bypassing masks, read-only protection, observers, and undo.
    pub fn write_backdoor(&mut self, number: u32, value: u64) -> Option<u64> {
        let idx = self.index(number)?;
        Some(self.block.write_backdoor(idx, value))
    }

    /// Sets the bits of `mask` in CSR `number` (`csrrs` semantics).
    pub fn set_bits(&mut self, number: u32, mask: u64) -> Option<u64> {
        let current = self.read_silent(number)?;
        self.write(number, current | mask)
    }

    /// Clears the bits of `mask` in CSR `number` (`csrrc` semantics).
    pub fn clear_bits(&mut self, number: u32, mask: u64) -> Option<u64> {
        let current = self.read_silent(number)?;
        self.write(number, current & !mask)
    }

    /// Returns `true` if writes from programs can never change CSR `number`.
    pub fn is_read_only(&self, number: u32) -> Option<bool> {
        let mut idx = self.index(number)?;
        loop {
            match self.block.get(idx)?.kind() {
                RegisterKind::ReadOnly => return Some(true),
                RegisterKind::Linked { parent, .. } => idx = parent,
                RegisterKind::Plain | RegisterKind::Masked { .. } => return Some(false),
            }
        }
    }

    /// Resolves a CSR name to its number.
    pub fn number_of(&self, name: &str) -> Option<u32> {
        let idx = self.block.index_of_name(name)?;
        self.block.get(idx).map(|r| r.number() as u32)
    }

    /// Returns the name of CSR `number`.
    pub fn name_of(&self, number: u32) -> Option<&'static str> {
        self.block.get(self.index(number)?).map(Register::name)
    }

    /// Reads a CSR by name.
    pub fn read_by_name(&self, name: &str) -> Option<u64> {
        self.read(self.number_of(name)?)
    }

    /// Writes a CSR by name.
    pub fn write_by_name(&mut self, name: &str, value: u64) -> Option<u64> {
        let number = self.number_of(name)?;
        self.write(number, value)
    }

    /// Advances `cycle` and `instret` by `retired` instructions.
    pub fn tick(&mut self, retired: u64) {
        for number in [CYCLE, INSTRET] {
            if let Some(idx) = self.index(number) {
                let next = self.block.peek(idx).wrapping_add(retired);
                let _ = self.block.write_backdoor(idx, next);
            }
        }
    }

    /// Sets the real-time clock, in milliseconds.
    pub fn set_time(&mut self, millis: u64) {
        let _ = self.write_backdoor(TIME, millis);
    }

    /// Restores every CSR to its reset value.
    pub fn reset(&mut self) {
        self.block.reset_all();
    }

    /// Subscribes to CSR `number`.
    pub fn subscribe(
        &mut self,
        number: u32,
        observer: Arc<dyn RegisterObserver>,
    ) -> Option<SubscriptionId> {
        let idx = self.index(number)?;
        self.block.subscribe(idx, observer)
    }

    /// Subscribes to every CSR.
    pub fn subscribe_all(&mut self, observer: Arc<dyn RegisterObserver>) -> SubscriptionId {
        self.block.subscribe_all(observer)
    }

    /// Removes a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.block.unsubscribe(id)
    }

    /// Iterates over the CSRs in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.block.iter()
    }
}

impl Default for ControlAndStatusRegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ControlAndStatusRegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlAndStatusRegisterFile")
            .field("registers", &self.block)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ControlAndStatusRegisterFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, register) in self.block.iter().enumerate() {
            writeln!(
                f,
                "{:<9}({:#05x}) = {:#010x}",
                register.name(),
                register.number(),
                self.block.peek(idx)
            )?;
        }
        Ok(())
    }
}
