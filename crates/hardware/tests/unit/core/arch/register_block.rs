//! Register Block Unit Tests.
//!
//! Verifies write dispatch for each register kind, name lookup with a numeric prefix, and
//! observer bookkeeping.

use pretty_assertions::assert_eq;
use riscv_state::common::{AccessType, RegisterAccessNotice};
use riscv_state::core::arch::{Register, RegisterBlock, RegisterKind};

use crate::common::harness::RegisterLog;

const PLAIN: usize = 0;
const READ_ONLY: usize = 1;
const MASKED: usize = 2;
const LOW_FIELD: usize = 3;
const HIGH_FIELD: usize = 4;

fn block() -> RegisterBlock {
    RegisterBlock::new(
        Some('r'),
        vec![
            Register::new("plain", 0, 5),
            Register::read_only("ro", 1, 7),
            Register::masked("masked", 2, 0, 0x0F),
            Register::linked("low", 3, MASKED, 0x0C),
            Register::linked("high", 4, MASKED, 0x30),
        ],
    )
}

// ══════════════════════════════════════════════════════════
// 1. Kinds
// ══════════════════════════════════════════════════════════

#[test]
fn plain_write_replaces_value() {
    let mut block = block();
    assert_eq!(block.write(PLAIN, 9), 5);
    assert_eq!(block.peek(PLAIN), 9);
}

#[test]
fn read_only_discards_program_writes() {
    let mut block = block();
    assert_eq!(block.write(READ_ONLY, 1), 7);
    assert_eq!(block.peek(READ_ONLY), 7);
    assert_eq!(block.write_backdoor(READ_ONLY, 1), 7);
    assert_eq!(block.peek(READ_ONLY), 1);
}

#[test]
fn masked_keeps_protected_bits() {
    let mut block = block();
    let _ = block.write_backdoor(MASKED, 0xF0);
    assert_eq!(block.write(MASKED, 0x0F), 0xF0);
    assert_eq!(block.peek(MASKED), 0xFF);
    let _ = block.write(MASKED, 0x00);
    assert_eq!(block.peek(MASKED), 0xF0);
}

#[test]
fn linked_reads_and_writes_parent_field() {
    let mut block = block();
    let _ = block.write(MASKED, 0x0F);
    assert_eq!(block.peek(LOW_FIELD), 0x3);

    assert_eq!(block.write(LOW_FIELD, 0x1), 0x3);
    assert_eq!(block.peek(MASKED), 0x07);
    assert_eq!(block.peek(LOW_FIELD), 0x1);
}

#[test]
fn linked_write_obeys_parent_mask() {
    let mut block = block();
    // Bits 4-5 are not writable in the parent.
    let _ = block.write(HIGH_FIELD, 0x3);
    assert_eq!(block.peek(MASKED), 0);
    assert_eq!(block.peek(HIGH_FIELD), 0);

    let _ = block.write_backdoor(HIGH_FIELD, 0x3);
    assert_eq!(block.peek(MASKED), 0x30);
    assert_eq!(block.peek(HIGH_FIELD), 0x3);
}

#[test]
fn linked_write_ignores_bits_beyond_field() {
    let mut block = block();
    let _ = block.write(LOW_FIELD, 0xFF);
    assert_eq!(block.peek(MASKED), 0x0C);
}

#[test]
fn kinds_are_reported() {
    let block = block();
    assert_eq!(block.get(PLAIN).map(Register::kind), Some(RegisterKind::Plain));
    assert_eq!(
        block.get(MASKED).map(Register::kind),
        Some(RegisterKind::Masked { writable: 0x0F })
    );
    assert_eq!(
        block.get(LOW_FIELD).map(Register::kind),
        Some(RegisterKind::Linked {
            parent: MASKED,
            mask: 0x0C
        })
    );
    assert!(block.get(5).is_none());
}

#[test]
fn reset_restores_reset_values() {
    let mut block = block();
    let _ = block.write(PLAIN, 1);
    let _ = block.write_backdoor(READ_ONLY, 1);
    block.change_reset_value(PLAIN, 42);
    block.reset_all();
    assert_eq!(block.peek(PLAIN), 42);
    assert_eq!(block.peek(READ_ONLY), 7);
}

// ══════════════════════════════════════════════════════════
// 2. Lookup
// ══════════════════════════════════════════════════════════

#[test]
fn lookup_by_name_and_number() {
    let block = block();
    assert_eq!(block.len(), 5);
    assert!(!block.is_empty());
    assert_eq!(block.index_of_name("masked"), Some(MASKED));
    assert_eq!(block.index_of_name("r2"), Some(MASKED));
    assert_eq!(block.index_of_name("r9"), None);
    assert_eq!(block.index_of_name("r"), None);
    assert_eq!(block.index_of_name("r+1"), None);
    assert_eq!(block.index_of_name("x2"), None);
    assert_eq!(block.index_of_number(4), Some(HIGH_FIELD));
    assert_eq!(block.index_of_number(-1), None);

    let names: Vec<&str> = block.iter().map(Register::name).collect();
    assert_eq!(names, ["plain", "ro", "masked", "low", "high"]);
}

#[test]
fn no_prefix_means_names_only() {
    let block = RegisterBlock::new(None, vec![Register::new("a", 0, 0)]);
    assert_eq!(block.index_of_name("a"), Some(0));
    assert_eq!(block.index_of_name("0"), None);
}

// ══════════════════════════════════════════════════════════
// 3. Observers
// ══════════════════════════════════════════════════════════

#[test]
fn read_and_write_notify_the_register() {
    let mut block = block();
    let log = RegisterLog::new();
    let _ = block.subscribe(PLAIN, log.clone()).unwrap();

    let _ = block.write(PLAIN, 1);
    let _ = block.read(PLAIN);
    let _ = block.peek(PLAIN);
    let _ = block.write_backdoor(PLAIN, 2);
    let _ = block.write(READ_ONLY, 0);

    assert_eq!(
        log.notices(),
        vec![
            RegisterAccessNotice {
                access: AccessType::Write,
                register: "plain",
            },
            RegisterAccessNotice {
                access: AccessType::Read,
                register: "plain",
            },
        ]
    );
}

#[test]
fn linked_write_notifies_parent_too() {
    let mut block = block();
    let log = RegisterLog::new();
    let _ = block.subscribe(MASKED, log.clone()).unwrap();
    let _ = block.write(LOW_FIELD, 1);
    assert_eq!(
        log.notices(),
        vec![RegisterAccessNotice {
            access: AccessType::Write,
            register: "masked",
        }]
    );
}

#[test]
fn subscribe_all_uses_one_id() {
    let mut block = block();
    let log = RegisterLog::new();
    let id = block.subscribe_all(log.clone());
    assert!(block.iter().all(|r| r.observer_count() == 1));

    let _ = block.read(HIGH_FIELD);
    assert_eq!(log.notices().len(), 1);

    assert!(block.unsubscribe(id));
    assert!(!block.unsubscribe(id));
    assert!(block.iter().all(|r| r.observer_count() == 0));
}

#[test]
fn subscribe_out_of_range_is_none() {
    let mut block = block();
    assert!(block.subscribe(99, RegisterLog::new()).is_none());
}
