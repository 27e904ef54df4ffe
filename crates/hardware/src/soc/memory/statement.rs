//! Program Statements.
//!
//! The text segment holds decoded instructions rather than raw words. This module provides:
//! 1. **Statement:** `ProgramStatement`, an instruction's binary encoding, address, and
//!    optional assembler source text.
//! 2. **Decoding seam:** `StatementDecoder`, implemented by the instruction decoder so memory
//!    can rebuild a statement when self-modifying code rewrites part of an instruction.

use std::fmt;

use crate::common::Exception;

/// A decoded instruction stored in the text segment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramStatement {
    binary: u32,
    address: u32,
    source: Option<String>,
}

impl ProgramStatement {
    /// Creates a statement carrying only its encoding.
    pub const fn new(binary: u32, address: u32) -> Self {
        Self {
            binary,
            address,
            source: None,
        }
    }

    /// Attaches the assembler source line the statement came from.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The 32-bit instruction encoding.
    pub const fn binary(&self) -> u32 {
        self.binary
    }

    /// The text segment address of the statement.
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// The source line, if the statement came from the assembler.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl fmt::Display for ProgramStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}: {:#010x}", self.address, self.binary)?;
        if let Some(source) = &self.source {
            write!(f, "  {source}")?;
        }
        Ok(())
    }
}

/// Turns a raw instruction encoding back into a statement.
///
/// Implemented by the instruction decoder. Memory calls it when a store rewrites an
/// instruction in place and when code is fetched from the data segment.
pub trait StatementDecoder: Send + Sync {
    /// Decodes `binary` as the instruction at `address`.
    ///
    /// # Errors
    ///
    /// Returns an illegal-instruction exception if the encoding is not a valid instruction.
    fn decode(&self, binary: u32, address: u32) -> Result<ProgramStatement, Exception>;
}

/// Decoder that accepts every encoding and keeps no source text.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawDecoder;

impl StatementDecoder for RawDecoder {
    fn decode(&self, binary: u32, address: u32) -> Result<ProgramStatement, Exception> {
        Ok(ProgramStatement::new(binary, address))
    }
}
