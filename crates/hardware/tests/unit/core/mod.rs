//! # Hart State
//!
//! Tests for the register files, the machine state, and trap entry.
