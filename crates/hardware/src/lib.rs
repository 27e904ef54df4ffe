//! RISC-V machine-state library.
//!
//! This crate implements the state layer of an instructional RV32 simulator with the following:
//! 1. **Memory:** Segmented, lazily allocated storage over selectable address layouts, with
//!    alignment faults, self-modifying code, observers, and a bump-pointer heap.
//! 2. **Registers:** General-purpose, floating-point (NaN-boxed), and control/status register
//!    files built from plain, read-only, masked, and linked registers.
//! 3. **Interrupts:** A three-channel interrupt controller with admission control and a
//!    condition-variable wake-up for `wfi`.
//! 4. **Exceptions:** A closed taxonomy of faults and control signals with a single
//!    disposition mapping for the execution loop.
//! 5. **Simulation:** Configuration, program loading, memory dumps, and backstep hooks.
//!
//! Instruction decoding and execution live outside this crate and plug in through
//! [`StatementDecoder`](soc::memory::statement::StatementDecoder) and the public state API.

/// Common types and constants (sizes, access notices, exceptions, observers).
pub mod common;
/// Machine configuration (layout preset, self-modifying code, start at main).
pub mod config;
/// Hart state (register files, machine state, trap entry).
pub mod core;
/// Loading, dumps, and backstep hooks.
pub mod sim;
/// Memory and interrupt controller.
pub mod soc;

/// Root configuration type; use `MachineConfig::default()` or load it from JSON.
pub use crate::config::MachineConfig;
/// Machine state and its shared handle.
pub use crate::core::{Machine, MachineState};
/// Segmented memory and interrupt controller.
pub use crate::soc::{InterruptController, Memory};
