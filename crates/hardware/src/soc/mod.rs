//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components outside the hart's register state: the segmented
//! memory and the interrupt controller that device models signal through.

/// Interrupt and synchronous trap signaling.
pub mod interrupts;

/// Segmented memory, address layouts, and program statements.
pub mod memory;

pub use interrupts::InterruptController;
pub use memory::Memory;
