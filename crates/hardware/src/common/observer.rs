//! Observer Interfaces.
//!
//! Tools and device models watch memory and registers through these traits. Notification is
//! synchronous and runs on the thread performing the access, with the machine lock held, so
//! implementations must return quickly and must not try to lock the machine again.

use std::sync::atomic::{AtomicU64, Ordering};

use super::data::{MemoryAccessNotice, RegisterAccessNotice};

/// Receiver of memory access notices.
pub trait MemoryObserver: Send + Sync {
    /// Called after a successful access overlapping the observer's subscribed range.
    fn memory_accessed(&self, notice: &MemoryAccessNotice);
}

impl<F> MemoryObserver for F
where
    F: Fn(&MemoryAccessNotice) + Send + Sync,
{
    fn memory_accessed(&self, notice: &MemoryAccessNotice) {
        self(notice);
    }
}

/// Receiver of register access notices.
pub trait RegisterObserver: Send + Sync {
    /// Called after a subscribed register is read or written.
    fn register_accessed(&self, notice: &RegisterAccessNotice);
}

impl<F> RegisterObserver for F
where
    F: Fn(&RegisterAccessNotice) + Send + Sync,
{
    fn register_accessed(&self, notice: &RegisterAccessNotice) {
        self(notice);
    }
}

/// Handle returned by every subscribe call; pass it back to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates a process-unique subscription id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    pub const fn get(self) -> u64 {
        self.0
    }
}
