//! Register Blocks.
//!
//! A register block is the shared machinery behind every register file. It provides:
//! 1. **Lookup:** By number, by exact name, or by a one-letter prefix followed by a number
//!    (`x5`, `f10`). Exact names win over prefixed numbers.
//! 2. **Dispatch:** Reads and writes that honour each register's [`RegisterKind`], including
//!    linked registers that resolve through their parent.
//! 3. **Bulk operations:** Reset, and subscribe/unsubscribe across the whole block.

use std::sync::Arc;

use super::register::{Register, RegisterKind, extract_field, insert_field};
use crate::common::{AccessType, RegisterObserver, SubscriptionId};

/// An ordered, fixed collection of registers.
#[derive(Clone, Debug)]
pub struct RegisterBlock {
    prefix: Option<char>,
    registers: Vec<Register>,
}

impl RegisterBlock {
    /// Creates a block.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Letter accepted before a register number in names (`'x'`, `'f'`).
    /// * `registers` - The registers, in index order. Numbers must be unique.
    pub fn new(prefix: Option<char>, registers: Vec<Register>) -> Self {
        debug_assert!(
            registers
                .iter()
                .enumerate()
                .all(|(i, r)| registers[..i].iter().all(|o| o.number() != r.number())),
            "register numbers must be unique within a block"
        );
        Self { prefix, registers }
    }

    /// Number of registers.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Returns `true` if the block has no registers.
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Returns the register at `index`.
    pub fn get(&self, index: usize) -> Option<&Register> {
        self.registers.get(index)
    }

    /// Iterates over the registers in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.registers.iter()
    }

    /// Finds the index of the register numbered `number`.
    pub fn index_of_number(&self, number: i32) -> Option<usize> {
        self.registers.iter().position(|r| r.number() == number)
    }

    /// Finds the index of a register by name.
    ///
    /// Exact names are tried first, then `prefix` followed by a decimal register number.
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        if let Some(index) = self.registers.iter().position(|r| r.name() == name) {
            return Some(index);
        }
        let digits = name.strip_prefix(self.prefix?)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.index_of_number(digits.parse().ok()?)
    }

    /// Current value of the register at `index`, without notifying observers.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn peek(&self, index: usize) -> u64 {
        let register = &self.registers[index];
        match register.kind() {
            RegisterKind::Linked { parent, mask } => extract_field(self.peek(parent), mask),
            RegisterKind::Plain | RegisterKind::ReadOnly | RegisterKind::Masked { .. } => {
                register.stored_value()
            }
        }
    }

    /// Reads the register at `index` and notifies its observers.
    pub fn read(&self, index: usize) -> u64 {
        let value = self.peek(index);
        self.registers[index].notify(AccessType::Read);
        value
    }

    /// Writes the register at `index` according to its kind and notifies observers.
    ///
    /// # Returns
    ///
    /// The value the register reported before the write.
    pub fn write(&mut self, index: usize, value: u64) -> u64 {
        let old = self.peek(index);
        self.store(index, value, false);
        self.registers[index].notify(AccessType::Write);
        if let RegisterKind::Linked { parent, .. } = self.registers[index].kind() {
            self.registers[parent].notify(AccessType::Write);
        }
        old
    }

    /// Writes the register at `index`, bypassing read-only and write masks, without
    /// notifying observers.
    ///
    /// # Returns
    ///
    /// The value the register reported before the write.
    pub fn write_backdoor(&mut self, index: usize, value: u64) -> u64 {
        let old = self.peek(index);
        self.store(index, value, true);
        old
    }

    fn store(&mut self, index: usize, value: u64, backdoor: bool) {
        match self.registers[index].kind() {
            RegisterKind::Plain => self.registers[index].value = value,
            RegisterKind::ReadOnly => {
                if backdoor {
                    self.registers[index].value = value;
                }
            }
            RegisterKind::Masked { writable } => {
                let register = &mut self.registers[index];
                register.value = if backdoor {
                    value
                } else {
                    (register.value & !writable) | (value & writable)
                };
            }
            RegisterKind::Linked { parent, mask } => {
                let merged = insert_field(self.peek(parent), mask, value);
                self.store(parent, merged, backdoor);
            }
        }
    }

    /// Changes the reset value of the register at `index`.
    pub fn change_reset_value(&mut self, index: usize, reset_value: u64) {
        self.registers[index].change_reset_value(reset_value);
    }

    /// Restores every register to its reset value.
    pub fn reset_all(&mut self) {
        self.registers.iter_mut().for_each(Register::reset);
    }

    /// Subscribes an observer to the register at `index`.
    pub fn subscribe(
        &mut self,
        index: usize,
        observer: Arc<dyn RegisterObserver>,
    ) -> Option<SubscriptionId> {
        Some(self.registers.get_mut(index)?.subscribe(observer))
    }

    /// Subscribes an observer to every register under a single id.
    pub fn subscribe_all(&mut self, observer: Arc<dyn RegisterObserver>) -> SubscriptionId {
        let id = SubscriptionId::next();
        for register in &mut self.registers {
            register.attach(id, Arc::clone(&observer));
        }
        id
    }

    /// Removes a subscription from every register it is attached to.
    ///
    /// # Returns
    ///
    /// `true` if at least one register held the subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.registers
            .iter_mut()
            .fold(false, |found, register| register.unsubscribe(id) | found)
    }
}

impl<'a> IntoIterator for &'a RegisterBlock {
    type Item = &'a Register;
    type IntoIter = std::slice::Iter<'a, Register>;

    fn into_iter(self) -> Self::IntoIter {
        self.registers.iter()
    }
}
