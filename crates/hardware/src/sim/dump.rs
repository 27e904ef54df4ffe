//! Memory Dumps.
//!
//! Writes the initialized prefix of a memory region to any [`Write`] sink. Dumps stop at the
//! first word whose storage was never allocated and use silent reads only, so observers
//! never see dump traffic.

use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

use crate::common::Exception;
use crate::common::constants::WORD_LENGTH_BYTES;
use crate::soc::memory::{Memory, Segment};

/// Output encoding of a dump.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DumpFormat {
    /// Raw little-endian words.
    #[default]
    Binary,
    /// One 8-digit hexadecimal word per line.
    HexText,
    /// One 32-digit binary word per line.
    BinaryText,
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Binary => "binary",
            Self::HexText => "hexadecimal text",
            Self::BinaryText => "binary text",
        })
    }
}

/// Failures while dumping memory.
#[derive(Debug, Error)]
pub enum DumpError {
    /// The sink rejected a write.
    #[error("could not write dump: {0}")]
    Io(#[from] io::Error),

    /// The range could not be read.
    #[error("could not read memory: {0}")]
    Memory(#[from] Exception),
}

/// Dumps the initialized words of `[base, limit)`.
///
/// # Returns
///
/// The number of words written.
///
/// # Errors
///
/// Fails if `base` is not word aligned or outside memory, or if the sink fails.
pub fn dump_range(
    memory: &Memory,
    base: u32,
    limit: u32,
    format: DumpFormat,
    out: &mut impl Write,
) -> Result<usize, DumpError> {
    let end = memory.address_of_first_null(base, limit)?;
    let mut written = 0;
    let mut address = base;
    while address < end {
        let word = memory.get_raw_word_or_null(address)?.unwrap_or(0);
        match format {
            DumpFormat::Binary => out.write_all(&word.to_le_bytes())?,
            DumpFormat::HexText => writeln!(out, "{word:08x}")?,
            DumpFormat::BinaryText => writeln!(out, "{word:032b}")?,
        }
        written += 1;
        address += WORD_LENGTH_BYTES;
    }
    Ok(written)
}

/// Dumps the initialized prefix of a whole segment.
///
/// # Errors
///
/// See [`dump_range`].
pub fn dump_segment(
    memory: &Memory,
    segment: Segment,
    format: DumpFormat,
    out: &mut impl Write,
) -> Result<usize, DumpError> {
    let (base, limit) = segment_range(memory, segment);
    dump_range(memory, base, limit, format, out)
}

/// Word-aligned `[base, limit)` covering `segment`.
pub fn segment_range(memory: &Memory, segment: Segment) -> (u32, u32) {
    let bounds = memory.bounds();
    let after = |last: u32| (last & !(WORD_LENGTH_BYTES - 1)).saturating_add(WORD_LENGTH_BYTES);
    match segment {
        Segment::Text => (bounds.text_base, after(bounds.text_limit)),
        Segment::Data => (bounds.data_base, after(bounds.data_limit)),
        Segment::Stack => (
            (bounds.stack_limit & !(WORD_LENGTH_BYTES - 1)).saturating_add(WORD_LENGTH_BYTES),
            after(bounds.stack_base),
        ),
        Segment::Mmio => (bounds.mmio_base, after(bounds.mmio_limit)),
    }
}
