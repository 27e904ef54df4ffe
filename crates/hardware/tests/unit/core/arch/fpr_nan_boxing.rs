//! Floating-Point Register NaN-Boxing Tests.
//!
//! Single-precision values live in the low half of a 64-bit register with the upper half
//! all ones. A single-precision read of anything else yields the canonical quiet NaN.

use proptest::prelude::*;
use riscv_state::core::arch::FloatingPointRegisterFile;

const CANONICAL_NAN: u32 = 0x7FC0_0000;

#[test]
fn write_word_nan_boxes() {
    let mut fprs = FloatingPointRegisterFile::new();
    let _ = fprs.write_word(1, 0x3F80_0000);
    assert_eq!(fprs.read_double(1), 0xFFFF_FFFF_3F80_0000);
    assert_eq!(fprs.read_word(1), 0x3F80_0000);
}

#[test]
fn unboxed_value_reads_as_canonical_nan() {
    let mut fprs = FloatingPointRegisterFile::new();
    let _ = fprs.write_double(2, 0x0000_0000_3F80_0000);
    assert_eq!(fprs.read_word(2), CANONICAL_NAN);
    assert!(fprs.read_f32(2).is_nan());

    // Upper half almost all ones is still not a box.
    let _ = fprs.write_double(2, 0xFFFF_FFFE_3F80_0000);
    assert_eq!(fprs.read_word(2), CANONICAL_NAN);
}

#[test]
fn reset_registers_are_not_boxed() {
    let fprs = FloatingPointRegisterFile::new();
    assert_eq!(fprs.read_double(0), 0);
    assert_eq!(fprs.read_word(0), CANONICAL_NAN);
}

#[test]
fn double_values_use_all_bits() {
    let mut fprs = FloatingPointRegisterFile::new();
    let _ = fprs.write_f64(3, 1.5);
    assert_eq!(fprs.read_double(3), 1.5f64.to_bits());
    assert!((fprs.read_f64(3) - 1.5).abs() < f64::EPSILON);
    // A double is not a boxed single.
    assert_eq!(fprs.read_word(3), CANONICAL_NAN);
}

#[test]
fn write_returns_previous_bits() {
    let mut fprs = FloatingPointRegisterFile::new();
    assert_eq!(fprs.write_word(4, 1), 0);
    assert_eq!(fprs.write_word(4, 2), 0xFFFF_FFFF_0000_0001);
}

#[test]
fn names_resolve_both_ways() {
    let mut fprs = FloatingPointRegisterFile::new();
    assert_eq!(fprs.index_of("fa0"), Some(10));
    assert_eq!(fprs.index_of("f10"), Some(10));
    assert_eq!(fprs.index_of("ft11"), Some(31));
    assert_eq!(fprs.index_of("f32"), None);

    assert_eq!(fprs.write_word_by_name("fs0", 0x4000_0000), Some(0));
    assert_eq!(fprs.read_word_by_name("f8"), Some(0x4000_0000));
    assert_eq!(fprs.read_word_by_name("a0"), None);
}

#[test]
fn backdoor_and_reset() {
    let mut fprs = FloatingPointRegisterFile::new();
    let _ = fprs.backdoor_write(5, 0xFFFF_FFFF_4040_0000);
    assert_eq!(fprs.read_silent(5), 0xFFFF_FFFF_4040_0000);
    fprs.reset();
    assert_eq!(fprs.read_silent(5), 0);
}

proptest! {
    #[test]
    fn f32_round_trip(value in any::<f32>().prop_filter("not NaN", |v| !v.is_nan())) {
        let mut fprs = FloatingPointRegisterFile::new();
        let _ = fprs.write_f32(7, value);
        prop_assert_eq!(fprs.read_f32(7).to_bits(), value.to_bits());
    }

    #[test]
    fn boxed_iff_upper_half_is_ones(bits in any::<u64>()) {
        let mut fprs = FloatingPointRegisterFile::new();
        let _ = fprs.write_double(9, bits);
        let expected = if bits >> 32 == 0xFFFF_FFFF { bits as u32 } else { CANONICAL_NAN };
        prop_assert_eq!(fprs.read_word(9), expected);
    }
}
