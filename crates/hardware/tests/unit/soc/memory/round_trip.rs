//! Store/Load Property Tests.
//!
//! Whatever is stored in the data, stack, or MMIO segment of any layout preset reads back
//! unchanged at every width, and the byte view of a stored word is always little-endian.

use proptest::prelude::*;
use riscv_state::Memory;
use riscv_state::soc::memory::SegmentBounds;
use riscv_state::soc::memory::layout::LayoutPreset;

const DATA: u8 = 0;
const STACK: u8 = 1;
const MMIO: u8 = 2;

/// Lowest and highest word address a store can land on in `segment`.
fn word_span(bounds: &SegmentBounds, segment: u8) -> (u32, u32) {
    match segment {
        DATA => (bounds.data_base, bounds.data_limit & !3),
        STACK => ((bounds.stack_limit & !3) + 4, bounds.stack_base & !3),
        _ => (bounds.mmio_base, bounds.mmio_limit & !3),
    }
}

fn word_in(preset: LayoutPreset, segment: u8, offset: u32) -> u32 {
    let (low, high) = word_span(&SegmentBounds::new(&preset.layout()), segment);
    let words = (u64::from(high) - u64::from(low)) / 4 + 1;
    low + (u64::from(offset) % words) as u32 * 4
}

fn preset() -> impl Strategy<Value = LayoutPreset> {
    prop::sample::select(LayoutPreset::ALL.to_vec())
}

fn data_word() -> impl Strategy<Value = (LayoutPreset, u32)> {
    (preset(), any::<u32>()).prop_map(|(preset, offset)| (preset, word_in(preset, DATA, offset)))
}

fn any_word_address() -> impl Strategy<Value = (LayoutPreset, u32)> {
    (preset(), prop_oneof![Just(DATA), Just(STACK), Just(MMIO)], any::<u32>())
        .prop_map(|(preset, segment, offset)| (preset, word_in(preset, segment, offset)))
}

proptest! {
    #[test]
    fn word_round_trip((preset, address) in any_word_address(), value in any::<u32>()) {
        let mut memory = Memory::new(preset.layout());
        prop_assert_eq!(memory.set_word(address, value).unwrap(), 0);
        prop_assert_eq!(memory.get_word(address).unwrap(), value);
        prop_assert_eq!(memory.get_raw_word(address).unwrap(), value);
    }

    #[test]
    fn half_round_trip(
        (preset, address) in any_word_address(),
        upper in any::<bool>(),
        value in any::<u16>()
    ) {
        let mut memory = Memory::new(preset.layout());
        let address = address + if upper { 2 } else { 0 };
        let _ = memory.set_half(address, value).unwrap();
        prop_assert_eq!(memory.get_half(address).unwrap(), value);
    }

    #[test]
    fn byte_round_trip(
        (preset, address) in any_word_address(),
        lane in 0u32..4,
        value in any::<u8>()
    ) {
        let mut memory = Memory::new(preset.layout());
        let _ = memory.set_byte(address + lane, value).unwrap();
        prop_assert_eq!(memory.get_byte(address + lane).unwrap(), value);
        let word = memory.get_word(address).unwrap();
        prop_assert_eq!(word, u32::from(value) << (lane * 8));
    }

    #[test]
    fn word_bytes_are_little_endian((preset, address) in any_word_address(), value in any::<u32>()) {
        let mut memory = Memory::new(preset.layout());
        let _ = memory.set_word(address, value).unwrap();
        for (lane, expected) in value.to_le_bytes().into_iter().enumerate() {
            prop_assert_eq!(memory.get_byte(address + lane as u32).unwrap(), expected);
        }
    }

    #[test]
    fn bytes_assemble_into_word((preset, address) in any_word_address(), bytes in any::<[u8; 4]>()) {
        let mut memory = Memory::new(preset.layout());
        for (lane, byte) in bytes.into_iter().enumerate() {
            let _ = memory.set_byte(address + lane as u32, byte).unwrap();
        }
        prop_assert_eq!(memory.get_word(address).unwrap(), u32::from_le_bytes(bytes));
    }

    #[test]
    fn neighbours_are_untouched((preset, address) in data_word(), value in any::<u32>()) {
        let mut memory = Memory::new(preset.layout());
        let (low, high) = word_span(memory.bounds(), DATA);
        let _ = memory.set_word(address, value).unwrap();
        if address > low {
            prop_assert_eq!(memory.get_word(address - 4).unwrap(), 0);
        }
        if address < high {
            prop_assert_eq!(memory.get_word(address + 4).unwrap(), 0);
        }
    }
}
