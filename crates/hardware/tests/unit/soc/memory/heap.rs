//! Heap and First-Null Unit Tests.
//!
//! Verifies the bump-pointer heap over the data segment and the scan for the first
//! never-allocated word used to find the end of a loaded program.

use riscv_state::Memory;
use riscv_state::common::HeapError;
use riscv_state::soc::memory::layout::{AddressLayout, LayoutPreset};
use riscv_state::soc::memory::statement::ProgramStatement;

const HEAP: u32 = 0x1004_0000;

#[test]
fn heap_starts_at_layout_heap_base() {
    let memory = Memory::default();
    assert_eq!(memory.heap_address(), HEAP);

    let compact = Memory::new(LayoutPreset::CompactTextAtZero.layout());
    assert_eq!(compact.heap_address(), 0x3000);
}

#[test]
fn allocations_are_word_rounded() {
    let mut memory = Memory::default();
    assert_eq!(memory.allocate_bytes_from_heap(5), Ok(HEAP));
    assert_eq!(memory.allocate_bytes_from_heap(4), Ok(HEAP + 8));
    assert_eq!(memory.allocate_bytes_from_heap(0), Ok(HEAP + 12));
    assert_eq!(memory.heap_address(), HEAP + 12);
}

#[test]
fn negative_request_is_rejected() {
    let mut memory = Memory::default();
    assert_eq!(
        memory.allocate_bytes_from_heap(-1),
        Err(HeapError::NegativeRequest(-1))
    );
    assert_eq!(memory.heap_address(), HEAP);
}

#[test]
fn allocation_past_data_segment_fails() {
    let mut memory = Memory::default();
    let data_limit = memory.bounds().data_limit;
    assert_eq!(data_limit, 0x103F_FFFF);

    let remaining = (data_limit + 1 - HEAP) as i32;
    assert_eq!(
        memory.allocate_bytes_from_heap(remaining),
        Err(HeapError::Exhausted(remaining))
    );
    assert_eq!(memory.heap_address(), HEAP);

    assert_eq!(memory.allocate_bytes_from_heap(remaining - 4), Ok(HEAP));
    assert_eq!(
        memory.allocate_bytes_from_heap(1),
        Err(HeapError::Exhausted(1))
    );
}

#[test]
fn clear_resets_heap_cursor() {
    let mut memory = Memory::default();
    let _ = memory.allocate_bytes_from_heap(64).unwrap();
    memory.clear();
    assert_eq!(memory.heap_address(), HEAP);
}

#[test]
fn first_null_in_data_is_block_granular() {
    let mut memory = Memory::default();
    let base = 0x1001_0000;
    assert_eq!(memory.address_of_first_null(base, base + 0x2000).unwrap(), base);

    // One written word allocates its whole 4 KiB block.
    let _ = memory.set_word(base + 8, 1).unwrap();
    assert_eq!(
        memory.address_of_first_null(base, base + 0x2000).unwrap(),
        0x1001_1000
    );
}

#[test]
fn first_null_stops_at_limit() {
    let mut memory = Memory::default();
    let base = 0x1001_0000;
    let _ = memory.set_word(base, 1).unwrap();
    assert_eq!(
        memory.address_of_first_null(base, base + 0x40).unwrap(),
        base + 0x40
    );
}

#[test]
fn first_null_in_text_is_statement_granular() {
    let layout = AddressLayout::default();
    let mut memory = Memory::new(layout);
    let base = layout.text_base;
    for i in 0..3 {
        let address = base + 4 * i;
        memory
            .set_statement(address, ProgramStatement::new(0x13, address))
            .unwrap();
    }
    assert_eq!(
        memory.address_of_first_null(base, base + 0x100).unwrap(),
        base + 12
    );
}
