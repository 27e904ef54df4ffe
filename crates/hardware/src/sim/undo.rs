//! Undo (Backstep) Hooks.
//!
//! The backstepper that lets a debugger step execution backwards lives outside this crate.
//! Memory and the register files report every instruction-visible write to it through
//! `UndoRecorder`, passing the value that was overwritten. Backdoor writes (tool- or
//! device-driven state) and the unchecked `Memory::set` are never reported.

use std::fmt;

/// Which register file a restore entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterFileKind {
    /// Integer registers `x0`-`x31`.
    General,
    /// Floating-point registers `f0`-`f31`.
    FloatingPoint,
    /// Control and status registers.
    ControlStatus,
}

/// Width of a memory store, as needed to restore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StoreWidth {
    /// One byte (`sb`).
    Byte,
    /// Two bytes (`sh`).
    Half,
    /// Four bytes (`sw`).
    Word,
    /// Eight bytes (`fsd`).
    DoubleWord,
    /// Four bytes without reinterpretation (instruction words, device registers).
    RawWord,
}

impl fmt::Display for StoreWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Byte => "byte",
            Self::Half => "half",
            Self::Word => "word",
            Self::DoubleWord => "double word",
            Self::RawWord => "raw word",
        };
        f.write_str(name)
    }
}

/// Receiver of previous values overwritten by the running program.
///
/// All methods default to doing nothing so recorders only implement what they track.
pub trait UndoRecorder: Send + Sync {
    /// A store of `width` at `address` replaced `old`.
    fn memory_written(&self, address: u32, width: StoreWidth, old: u64) {
        let _ = (address, width, old);
    }

    /// Register `number` of `file` was overwritten; `old` was its value.
    fn register_written(&self, file: RegisterFileKind, number: i32, old: u64) {
        let _ = (file, number, old);
    }

    /// The program counter was explicitly set; `old` was its value.
    fn program_counter_written(&self, old: u32) {
        let _ = old;
    }
}
