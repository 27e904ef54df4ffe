//! Common utilities and types used throughout the machine-state layer.
//!
//! This module provides the building blocks shared by memory, the register files, and the
//! interrupt path. It includes:
//! 1. **Constants:** Access widths, block geometry, and interrupt bit positions.
//! 2. **Access Notices:** Records delivered to memory and register observers.
//! 3. **Error Handling:** The exception taxonomy and host-side error types.
//! 4. **Observers:** Observer traits and subscription handles.

/// Common constants used throughout the machine.
pub mod constants;

/// Access type and notice definitions.
pub mod data;

/// Exception taxonomy and error types.
pub mod error;

/// Observer traits and subscription ids.
pub mod observer;

pub use data::{AccessType, MemoryAccessNotice, RegisterAccessNotice};
pub use error::{ConfigError, Disposition, Exception, ExceptionCause, HeapError};
pub use observer::{MemoryObserver, RegisterObserver, SubscriptionId};
