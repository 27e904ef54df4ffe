//! Register Primitives.
//!
//! A register is a named, numbered 64-bit cell with a reset value and a list of observers.
//! Behaviour on write is selected by a [`RegisterKind`] instead of a type hierarchy:
//! 1. **Plain:** Writes replace the value.
//! 2. **Read-only:** Writes are accepted and discarded.
//! 3. **Masked:** Only the writable bits take the new value; the rest keep their old value.
//! 4. **Linked:** The register has no storage of its own and is a bit window into another
//!    register of the same block.
//!
//! Linked registers need their parent to resolve, so reads and writes are dispatched by
//! [`RegisterBlock`](super::block::RegisterBlock), which owns both.

use std::fmt;
use std::sync::Arc;

use crate::common::{AccessType, RegisterAccessNotice, RegisterObserver, SubscriptionId};

/// Write behaviour of a register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegisterKind {
    /// Ordinary read/write storage.
    Plain,
    /// Writes are silently ignored (backdoor writes still land).
    ReadOnly,
    /// Only bits set in `writable` change on write.
    Masked {
        /// Bits that take the written value.
        writable: u64,
    },
    /// A window onto the bits of `parent` selected by `mask`.
    ///
    /// Reads return `(parent & mask) >> mask.trailing_zeros()`. Writes shift the value into
    /// place and are forwarded to the parent through the parent's own kind.
    Linked {
        /// Block index of the parent register.
        parent: usize,
        /// Parent bits covered by this register.
        mask: u64,
    },
}

/// A single architectural register.
#[derive(Clone)]
pub struct Register {
    name: &'static str,
    number: i32,
    pub(super) value: u64,
    reset_value: u64,
    kind: RegisterKind,
    observers: Vec<(SubscriptionId, Arc<dyn RegisterObserver>)>,
}

impl Register {
    /// Creates a plain register holding its reset value.
    pub const fn new(name: &'static str, number: i32, reset_value: u64) -> Self {
        Self::with_kind(name, number, reset_value, RegisterKind::Plain)
    }

    /// Creates a register whose program-visible writes are discarded.
    pub const fn read_only(name: &'static str, number: i32, reset_value: u64) -> Self {
        Self::with_kind(name, number, reset_value, RegisterKind::ReadOnly)
    }

    /// Creates a register where only `writable` bits accept writes.
    pub const fn masked(name: &'static str, number: i32, reset_value: u64, writable: u64) -> Self {
        Self::with_kind(name, number, reset_value, RegisterKind::Masked { writable })
    }

    /// Creates a window onto the `mask` bits of the register at block index `parent`.
    pub const fn linked(name: &'static str, number: i32, parent: usize, mask: u64) -> Self {
        Self::with_kind(name, number, 0, RegisterKind::Linked { parent, mask })
    }

    const fn with_kind(name: &'static str, number: i32, reset_value: u64, kind: RegisterKind) -> Self {
        Self {
            name,
            number,
            value: reset_value,
            reset_value,
            kind,
            observers: Vec::new(),
        }
    }

    /// The register's canonical name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The register's number (`-1` for the program counter).
    pub const fn number(&self) -> i32 {
        self.number
    }

    /// The register's write behaviour.
    pub const fn kind(&self) -> RegisterKind {
        self.kind
    }

    /// The stored value; meaningless for linked registers, which store nothing.
    pub const fn stored_value(&self) -> u64 {
        self.value
    }

    /// The value restored by [`Register::reset`].
    pub const fn reset_value(&self) -> u64 {
        self.reset_value
    }

    /// Changes the reset value without touching the current value.
    pub fn change_reset_value(&mut self, reset_value: u64) {
        self.reset_value = reset_value;
    }

    /// Restores the reset value.
    pub fn reset(&mut self) {
        self.value = self.reset_value;
    }

    /// Adds an observer and returns its subscription id.
    pub fn subscribe(&mut self, observer: Arc<dyn RegisterObserver>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.attach(id, observer);
        id
    }

    pub(super) fn attach(&mut self, id: SubscriptionId, observer: Arc<dyn RegisterObserver>) {
        self.observers.push((id, observer));
    }

    /// Removes an observer; returns `false` if it was not subscribed here.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Number of observers attached to this register.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(super) fn notify(&self, access: AccessType) {
        if self.observers.is_empty() {
            return;
        }
        let notice = RegisterAccessNotice {
            access,
            register: self.name,
        };
        for (_, observer) in &self.observers {
            observer.register_accessed(&notice);
        }
    }
}

impl fmt::Debug for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Register")
            .field("name", &self.name)
            .field("number", &self.number)
            .field("value", &format_args!("{:#x}", self.value))
            .field("kind", &self.kind)
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Places `value` into the `mask` window of `base`.
pub(super) fn insert_field(base: u64, mask: u64, value: u64) -> u64 {
    let shifted = value.checked_shl(mask.trailing_zeros()).unwrap_or(0);
    (base & !mask) | (shifted & mask)
}

/// Extracts the `mask` window of `base`.
pub(super) fn extract_field(base: u64, mask: u64) -> u64 {
    (base & mask).checked_shr(mask.trailing_zeros()).unwrap_or(0)
}
