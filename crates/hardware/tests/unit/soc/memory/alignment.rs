//! Alignment Unit Tests.
//!
//! Verifies that the aligned accessors reject misaligned addresses with the matching
//! load/store cause, and that the unchecked `get`/`set` assemble bytes little-endian
//! across word boundaries.

use riscv_state::Memory;
use riscv_state::common::{Exception, ExceptionCause};

const DATA: u32 = 0x1001_0000;

fn cause_of(result: Result<impl Sized, Exception>) -> Option<ExceptionCause> {
    result.err().and_then(|e| e.cause())
}

// ══════════════════════════════════════════════════════════
// 1. Misaligned aligned-accessors
// ══════════════════════════════════════════════════════════

#[test]
fn word_load_misaligned() {
    let memory = Memory::default();
    for offset in 1..4 {
        let error = memory.get_word(DATA + offset).unwrap_err();
        assert_eq!(
            error,
            Exception::address_error(
                ExceptionCause::LoadAddressMisaligned,
                DATA + offset,
                "address for load not aligned on boundary",
            )
        );
    }
}

#[test]
fn word_store_misaligned() {
    let mut memory = Memory::default();
    let error = memory.set_word(DATA + 2, 7).unwrap_err();
    assert_eq!(error.cause(), Some(ExceptionCause::StoreAddressMisaligned));
    assert_eq!(error.trap_value(), DATA + 2);
    // Nothing was written.
    assert_eq!(memory.get_word(DATA).unwrap(), 0);
}

#[test]
fn half_alignment() {
    let mut memory = Memory::default();
    assert_eq!(
        cause_of(memory.get_half(DATA + 1)),
        Some(ExceptionCause::LoadAddressMisaligned)
    );
    assert_eq!(
        cause_of(memory.set_half(DATA + 3, 1)),
        Some(ExceptionCause::StoreAddressMisaligned)
    );
    assert!(memory.set_half(DATA + 2, 0xBEEF).is_ok());
    assert_eq!(memory.get_half(DATA + 2).unwrap(), 0xBEEF);
}

#[test]
fn byte_access_never_misaligned() {
    let mut memory = Memory::default();
    for offset in 0..4 {
        assert!(memory.set_byte(DATA + offset, offset as u8).is_ok());
    }
    assert_eq!(memory.get_word(DATA).unwrap(), 0x0302_0100);
}

#[test]
fn double_word_requires_eight_byte_alignment() {
    let mut memory = Memory::default();
    assert_eq!(
        cause_of(memory.set_double_word(DATA + 4, 1)),
        Some(ExceptionCause::StoreAddressMisaligned)
    );
    assert_eq!(
        cause_of(memory.get_double_word(DATA + 4)),
        Some(ExceptionCause::LoadAddressMisaligned)
    );

    let old = memory
        .set_double_word(DATA + 8, 0x1122_3344_5566_7788)
        .unwrap();
    assert_eq!(old, 0);
    assert_eq!(memory.get_word(DATA + 8).unwrap(), 0x5566_7788);
    assert_eq!(memory.get_word(DATA + 12).unwrap(), 0x1122_3344);
    assert_eq!(memory.get_double_word(DATA + 8).unwrap(), 0x1122_3344_5566_7788);
}

#[test]
fn raw_word_alignment() {
    let mut memory = Memory::default();
    assert_eq!(
        cause_of(memory.get_raw_word(DATA + 1)),
        Some(ExceptionCause::LoadAddressMisaligned)
    );
    assert_eq!(
        cause_of(memory.set_raw_word(DATA + 1, 0)),
        Some(ExceptionCause::StoreAddressMisaligned)
    );
}

// ══════════════════════════════════════════════════════════
// 2. Unchecked access across word boundaries
// ══════════════════════════════════════════════════════════

#[test]
fn unaligned_set_spans_two_words() {
    let mut memory = Memory::default();
    let old = memory.set(DATA + 1, 0xAABB_CCDD, 4).unwrap();
    assert_eq!(old, 0);
    assert_eq!(memory.get_word(DATA).unwrap(), 0xBBCC_DD00);
    assert_eq!(memory.get_word(DATA + 4).unwrap(), 0x0000_00AA);
    assert_eq!(memory.get(DATA + 1, 4).unwrap(), 0xAABB_CCDD);
}

#[test]
fn unaligned_set_returns_overwritten_bytes() {
    let mut memory = Memory::default();
    let _ = memory.set_word(DATA, 0x4433_2211).unwrap();
    let _ = memory.set_word(DATA + 4, 0x8877_6655).unwrap();
    let old = memory.set(DATA + 3, 0, 2).unwrap();
    assert_eq!(old, 0x5544);
    assert_eq!(memory.get_word(DATA).unwrap(), 0x0033_2211);
    assert_eq!(memory.get_word(DATA + 4).unwrap(), 0x8877_6600);
}

#[test]
fn set_truncates_to_length() {
    let mut memory = Memory::default();
    let _ = memory.set(DATA, 0xFFFF_FF12, 1).unwrap();
    assert_eq!(memory.get_word(DATA).unwrap(), 0x12);
}

#[test]
#[should_panic(expected = "memory access length must be 1, 2, 4 or 8 bytes")]
fn unsupported_length_panics() {
    let memory = Memory::default();
    let _ = memory.get(DATA, 3);
}
