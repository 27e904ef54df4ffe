//! Exception and Error definitions.
//!
//! This module defines the error handling vocabulary of the machine-state layer. It provides:
//! 1. **Exception Taxonomy:** A closed set of faults and control signals raised by memory,
//!    registers, and instruction execution.
//! 2. **Cause Codes:** The RISC-V exception codes written into `ucause`.
//! 3. **Disposition:** A single exhaustive mapping from an exception to what the execution
//!    loop must do with it.
//! 4. **Host Errors:** Configuration and heap errors that are reported to the caller instead
//!    of being surfaced to the simulated program.

use std::fmt;

use thiserror::Error;

use super::constants::INSTRUCTION_LENGTH;

/// RISC-V synchronous exception codes.
///
/// The discriminant of each variant is the value written into `ucause`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ExceptionCause {
    /// Instruction fetch from an address that is not instruction aligned.
    InstructionAddressMisaligned = 0,
    /// Instruction fetch outside the text segment.
    InstructionAccessFault = 1,
    /// Undecodable or unimplemented instruction.
    IllegalInstruction = 2,
    /// `ebreak` executed.
    Breakpoint = 3,
    /// Load from an address that is not naturally aligned.
    LoadAddressMisaligned = 4,
    /// Load from an unmapped or protected address.
    LoadAccessFault = 5,
    /// Store to an address that is not naturally aligned.
    StoreAddressMisaligned = 6,
    /// Store to an unmapped or protected address.
    StoreAccessFault = 7,
    /// `ecall` executed from user mode.
    EnvironmentCall = 8,
}

impl ExceptionCause {
    /// Returns the numeric cause code.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Looks up the cause for a numeric code.
    ///
    /// # Arguments
    ///
    /// * `code` - A `ucause` value with the interrupt bit clear.
    ///
    /// # Returns
    ///
    /// The matching cause, or `None` for reserved or unsupported codes.
    pub const fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => Self::InstructionAddressMisaligned,
            1 => Self::InstructionAccessFault,
            2 => Self::IllegalInstruction,
            3 => Self::Breakpoint,
            4 => Self::LoadAddressMisaligned,
            5 => Self::LoadAccessFault,
            6 => Self::StoreAddressMisaligned,
            7 => Self::StoreAccessFault,
            8 => Self::EnvironmentCall,
            _ => return None,
        })
    }
}

impl fmt::Display for ExceptionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InstructionAddressMisaligned => "instruction address misaligned",
            Self::InstructionAccessFault => "instruction access fault",
            Self::IllegalInstruction => "illegal instruction",
            Self::Breakpoint => "breakpoint",
            Self::LoadAddressMisaligned => "load address misaligned",
            Self::LoadAccessFault => "load access fault",
            Self::StoreAddressMisaligned => "store address misaligned",
            Self::StoreAccessFault => "store access fault",
            Self::EnvironmentCall => "environment call",
        };
        f.write_str(name)
    }
}

/// Faults and control signals raised while a program runs.
///
/// Exceptions are constructed at the point of fault and returned up to the execution loop,
/// which is the only place that decides their fate (see [`Exception::disposition`]).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Exception {
    /// `ebreak` was executed.
    ///
    /// Stops execution so a debugger can inspect the machine.
    #[error("breakpoint")]
    Breakpoint,

    /// `wfi` was executed.
    ///
    /// The execution thread suspends until an interrupt channel becomes pending.
    #[error("waiting for interrupt")]
    Wait,

    /// The program is terminating.
    ///
    /// Raised by the exit system call, or by an unrecoverable error inside a system call.
    #[error("program exited with code {code}")]
    Exiting {
        /// Exit status reported by the program.
        code: i32,
        /// Description of the unrecoverable error, if the exit was not voluntary.
        message: Option<String>,
    },

    /// A misaligned or out-of-range memory access.
    #[error("{message} {address:#010x}")]
    AddressError {
        /// Which of the load/store/fetch faults occurred.
        reason: ExceptionCause,
        /// The faulting address.
        address: u32,
        /// Short description of the fault.
        message: &'static str,
    },

    /// A general runtime fault.
    #[error("{message}")]
    Simulation {
        /// Cause code to report in `ucause`.
        reason: ExceptionCause,
        /// Value to report in `utval` (faulting address, offending encoding, ...).
        value: Option<u32>,
        /// Formatted message, already naming the faulting program counter when known.
        message: String,
    },
}

/// What the execution loop must do with an [`Exception`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Enter the program's trap handler with this cause and trap value.
    Trap {
        /// Cause written into `ucause`.
        cause: ExceptionCause,
        /// Value written into `utval`.
        value: u32,
    },
    /// Stop stepping and hand control to the debugger.
    Break,
    /// Suspend until an interrupt is pending.
    Suspend,
    /// End the run.
    Terminate,
}

impl Exception {
    /// Creates an address error.
    ///
    /// # Arguments
    ///
    /// * `reason` - The fault class.
    /// * `address` - The faulting address.
    /// * `message` - Short description of the fault.
    pub const fn address_error(reason: ExceptionCause, address: u32, message: &'static str) -> Self {
        Self::AddressError {
            reason,
            address,
            message,
        }
    }

    /// Creates a general runtime fault without a program counter reference.
    pub fn simulation(reason: ExceptionCause, value: Option<u32>, message: impl Into<String>) -> Self {
        Self::Simulation {
            reason,
            value,
            message: message.into(),
        }
    }

    /// Creates a runtime fault raised by the instruction preceding `pc`.
    ///
    /// The program counter has already been advanced past the faulting instruction, so
    /// the message names `pc - INSTRUCTION_LENGTH`.
    ///
    /// # Arguments
    ///
    /// * `pc` - The current (already incremented) program counter.
    /// * `reason` - Cause code to report.
    /// * `value` - Optional trap value.
    /// * `message` - Description of the fault.
    pub fn runtime(pc: u32, reason: ExceptionCause, value: Option<u32>, message: &str) -> Self {
        Self::Simulation {
            reason,
            value,
            message: format!(
                "Runtime exception at {:#010x}: {message}",
                pc.wrapping_sub(INSTRUCTION_LENGTH)
            ),
        }
    }

    /// Creates an exit signal.
    pub const fn exit(code: i32) -> Self {
        Self::Exiting {
            code,
            message: None,
        }
    }

    /// Attaches the faulting program counter to this exception.
    ///
    /// Address errors become runtime faults whose value is the faulting address. Other
    /// variants are returned unchanged.
    ///
    /// # Arguments
    ///
    /// * `pc` - The current (already incremented) program counter.
    #[must_use]
    pub fn at_pc(self, pc: u32) -> Self {
        match self {
            Self::AddressError {
                reason,
                address,
                message,
            } => Self::runtime(
                pc,
                reason,
                Some(address),
                &format!("{message} {address:#010x}"),
            ),
            other => other,
        }
    }

    /// Returns the cause code for exceptions that can be trapped.
    pub const fn cause(&self) -> Option<ExceptionCause> {
        match self {
            Self::AddressError { reason, .. } | Self::Simulation { reason, .. } => Some(*reason),
            Self::Breakpoint | Self::Wait | Self::Exiting { .. } => None,
        }
    }

    /// Returns the value to write into `utval` (zero when there is none).
    pub const fn trap_value(&self) -> u32 {
        match self {
            Self::AddressError { address, .. } => *address,
            Self::Simulation { value, .. } => match value {
                Some(v) => *v,
                None => 0,
            },
            Self::Breakpoint | Self::Wait | Self::Exiting { .. } => 0,
        }
    }

    /// Classifies the exception for the execution loop.
    pub const fn disposition(&self) -> Disposition {
        match self {
            Self::Breakpoint => Disposition::Break,
            Self::Wait => Disposition::Suspend,
            Self::Exiting { .. } => Disposition::Terminate,
            Self::AddressError {
                reason, address, ..
            } => Disposition::Trap {
                cause: *reason,
                value: *address,
            },
            Self::Simulation { reason, .. } => Disposition::Trap {
                cause: *reason,
                value: self.trap_value(),
            },
        }
    }
}

/// Host-side configuration and validation errors.
///
/// These are never shown to the simulated program; they are returned to whoever
/// configured the machine (a tool, a device model, or a config file loader).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An observer range endpoint is not word aligned.
    #[error("observer range endpoint {0:#010x} is not word aligned")]
    MisalignedRange(u32),

    /// An observer range ends before it starts.
    #[error("observer range {low:#010x}..{high:#010x} ends before it starts")]
    InvertedRange {
        /// Requested start address.
        low: u32,
        /// Requested end address.
        high: u32,
    },

    /// An observer range straddles `0x80000000`.
    #[error("observer range {low:#010x}..{high:#010x} crosses 0x80000000; split it up")]
    RangeCrossesSignBoundary {
        /// Requested start address.
        low: u32,
        /// Requested end address.
        high: u32,
    },

    /// The named memory layout does not exist.
    #[error("unknown memory layout `{0}`")]
    UnknownLayout(String),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A configuration file could not be read.
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the bump-pointer heap allocator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum HeapError {
    /// The request was for a negative number of bytes.
    #[error("request ({0}) is negative heap amount")]
    NegativeRequest(i32),

    /// The request would move the heap past the end of the data segment.
    #[error("request ({0}) exceeds available heap storage")]
    Exhausted(i32),
}
