//! Machine configuration.
//!
//! This module defines the configuration structures used to build a
//! [`MachineState`](crate::core::state::MachineState). It provides:
//! 1. **Defaults:** Every field has a default, so an empty document is a valid configuration.
//! 2. **Structures:** Memory settings (layout preset, self-modifying code) and register
//!    settings (start at `main`).
//! 3. **Loading:** JSON parsing from a string or a file.
//!
//! Example document:
//!
//! ```json
//! {
//!   "memory": { "layout": "CompactTextAtZero", "self_modifying_code": true },
//!   "registers": { "start_at_main": true }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::common::ConfigError;
use crate::soc::memory::layout::LayoutPreset;

/// Root configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Memory subsystem settings.
    pub memory: MemoryConfig,
    /// Register file settings.
    pub registers: RegisterConfig,
}

/// Memory subsystem settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Address layout preset.
    pub layout: LayoutPreset,
    /// Allow programs to write (and fetch from) instruction memory.
    pub self_modifying_code: bool,
}

/// Register file settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegisterConfig {
    /// Start execution at the `main` label instead of the text base.
    pub start_at_main: bool,
}

impl MachineConfig {
    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents or unknown layout names.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and [`ConfigError::Parse`]
    /// if it is not a valid configuration.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
