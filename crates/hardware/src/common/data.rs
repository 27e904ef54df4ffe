//! Access Notices.
//!
//! This module defines the records delivered to observers of memory and registers.
//! These types are used for the following:
//! 1. **Classification:** Distinguishing reads from writes.
//! 2. **Memory Notices:** Reporting the address, width, and value of a memory transfer.
//! 3. **Register Notices:** Reporting which register was read or written.

use std::fmt;

/// Type of access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessType {
    /// Data read access (loads, fetches, register reads).
    Read,

    /// Data write access (stores, register writes).
    Write,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// Notice delivered to memory observers after every successful access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryAccessNotice {
    /// Whether the access read or wrote memory.
    pub access: AccessType,
    /// First byte address of the access.
    pub address: u32,
    /// Number of bytes transferred.
    pub length: u32,
    /// Value read or written (zero-extended).
    pub value: u64,
}

impl MemoryAccessNotice {
    /// Returns the last byte address touched by the access.
    pub const fn last_address(&self) -> u64 {
        self.address as u64 + self.length.saturating_sub(1) as u64
    }
}

impl fmt::Display for MemoryAccessNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:#010x} len={} value={:#x}",
            self.access, self.address, self.length, self.value
        )
    }
}

/// Notice delivered to register observers after a read or write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterAccessNotice {
    /// Whether the register was read or written.
    pub access: AccessType,
    /// Name of the register (`t0`, `fa0`, `fcsr`, `pc`, ...).
    pub register: &'static str,
}
