//! Hart state.
//!
//! This module contains the architectural state of the simulated hart: the register
//! family, the machine state that owns it alongside memory, and trap entry.

/// Architectural registers (GPRs, FPRs, CSRs, and the primitives they are built from).
pub mod arch;

/// Machine state and its shared, lock-protected handle.
pub mod state;

/// Trap and interrupt entry.
pub mod trap;

pub use self::state::{Machine, MachineState};
