//! Global Machine Constants.
//!
//! This module defines the sizes and bit patterns shared by the memory subsystem,
//! the register files, and the trap path. It includes:
//! 1. **Access Widths:** Byte lengths of the naturally aligned access sizes.
//! 2. **Block Geometry:** Dimensions of the lazily allocated block tables backing memory.
//! 3. **Interrupt Bits:** The `uip`/`uie`/`ustatus` bit positions used for user-level traps.
//! 4. **Cause Encoding:** The interrupt flag carried in `ucause`.

/// Length of a byte access in bytes.
pub const BYTE_LENGTH_BYTES: u32 = 1;

/// Length of a half-word access in bytes.
pub const HALF_LENGTH_BYTES: u32 = 2;

/// Length of a word access in bytes.
pub const WORD_LENGTH_BYTES: u32 = 4;

/// Length of a double-word access in bytes.
pub const DOUBLEWORD_LENGTH_BYTES: u32 = 8;

/// Length of one (uncompressed) instruction in bytes.
///
/// The program counter is incremented before an instruction executes, so the
/// faulting instruction of a runtime exception sits this many bytes below it.
pub const INSTRUCTION_LENGTH: u32 = 4;

/// Number of words held by one memory block (4 KiB).
pub const BLOCK_LENGTH_WORDS: usize = 1024;

/// Number of bytes held by one memory block.
pub const BLOCK_LENGTH_BYTES: u32 = BLOCK_LENGTH_WORDS as u32 * WORD_LENGTH_BYTES;

/// Number of blocks in the text, data, and stack block tables (4 MiB each).
pub const BLOCK_TABLE_LENGTH: usize = 1024;

/// Number of blocks in the memory-mapped I/O block table (64 KiB).
pub const MMIO_TABLE_LENGTH: usize = 16;

/// Byte capacity of the text, data, and stack segments.
pub const SEGMENT_CAPACITY_BYTES: u64 = BLOCK_TABLE_LENGTH as u64 * BLOCK_LENGTH_BYTES as u64;

/// Byte capacity of the memory-mapped I/O segment.
pub const MMIO_CAPACITY_BYTES: u64 = MMIO_TABLE_LENGTH as u64 * BLOCK_LENGTH_BYTES as u64;

/// First address of the upper (signed-negative) half of the address space.
///
/// Observer ranges may not straddle this boundary.
pub const SIGNED_BOUNDARY: u32 = 0x8000_0000;

/// User software interrupt bit in `uip`/`uie`.
pub const SOFTWARE_INTERRUPT: u64 = 0x1;

/// User timer interrupt bit in `uip`/`uie`.
pub const TIMER_INTERRUPT: u64 = 0x10;

/// User external interrupt bit in `uip`/`uie`.
pub const EXTERNAL_INTERRUPT: u64 = 0x100;

/// User interrupt enable bit (`UIE`) in `ustatus`.
pub const INTERRUPT_ENABLE: u64 = 0x1;

/// User previous interrupt enable bit (`UPIE`) in `ustatus`.
pub const PREVIOUS_INTERRUPT_ENABLE: u64 = 0x10;

/// Bit set in `ucause` when the trap is an interrupt rather than an exception.
pub const CAUSE_INTERRUPT_BIT: u32 = 1 << 31;

/// Pattern returned for a single-precision read of a register that is not NaN-boxed.
pub const CANONICAL_NAN_F32: u32 = 0x7FC0_0000;

/// Upper 32 bits that mark a valid NaN-boxed single-precision value.
pub const NAN_BOX_MASK: u64 = 0xFFFF_FFFF_0000_0000;
