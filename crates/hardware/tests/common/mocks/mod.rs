//! # Mocks
//!
//! Doubles for the collaborators the machine state reports to.

/// Mock backstep recorder.
pub mod undo;
