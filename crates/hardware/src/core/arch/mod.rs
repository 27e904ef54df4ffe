//! RISC-V architectural register state.
//!
//! This module contains the register family of the simulated hart.
//! It includes the following modules:
//! 1. **Registers:** The register cell and its write behaviours.
//! 2. **Blocks:** Lookup and dispatch over a fixed collection of registers.
//! 3. **GPRs:** General-Purpose Register file and program counter.
//! 4. **FPRs:** Floating-Point Register file with NaN-boxing.
//! 5. **CSRs:** Control and Status Register definitions and access logic.

/// Register blocks: lookup, dispatch, and bulk operations.
pub mod block;

/// Control and Status Register (CSR) definitions and access logic.
pub mod csr;

/// Floating-Point Register file implementation.
pub mod fpr;

/// General-Purpose Register file implementation.
pub mod gpr;

/// Register cells and their write behaviours.
pub mod register;

pub use self::block::RegisterBlock;
pub use self::csr::ControlAndStatusRegisterFile;
pub use self::fpr::FloatingPointRegisterFile;
pub use self::gpr::RegisterFile;
pub use self::register::{Register, RegisterKind};
