//! Simulation support.
//!
//! Utilities the execution loop and tools build on:
//! 1. **Undo hooks:** The interface through which writes are reported to a backstepper.
//! 2. **Loading:** Placing instruction words, data, and ELF images into memory.
//! 3. **Dumps:** Writing initialized memory to a file or buffer.

/// Memory dumps.
pub mod dump;

/// Program and ELF loading.
pub mod loader;

/// Backstep recording hooks.
pub mod undo;
