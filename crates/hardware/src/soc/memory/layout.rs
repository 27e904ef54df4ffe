//! Address Layouts.
//!
//! An address layout names the sixteen addresses that carve the 32-bit address space into
//! segments. This module provides:
//! 1. **Layout record:** `AddressLayout`, an immutable set of base and limit addresses.
//! 2. **Presets:** The fixed catalog of layouts a machine can be configured with.
//! 3. **Parsing:** Preset lookup by identifier for configuration files and tools.
//!
//! All limit addresses are inclusive.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::common::ConfigError;

/// The sixteen addresses that define segment boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AddressLayout {
    /// First address of the text segment.
    pub text_base: u32,
    /// First address of the data segment.
    pub data_segment_base: u32,
    /// First address of the `.extern` area.
    pub extern_base: u32,
    /// Reset value of the global pointer (`gp`).
    pub global_pointer: u32,
    /// First address of static `.data`.
    pub data_base: u32,
    /// Initial heap cursor.
    pub heap_base: u32,
    /// Reset value of the stack pointer (`sp`).
    pub stack_pointer: u32,
    /// Highest word of the stack; the stack grows down from here.
    pub stack_base: u32,
    /// Highest user-space address.
    pub user_high: u32,
    /// First kernel-space address.
    pub kernel_base: u32,
    /// First memory-mapped I/O address.
    pub mmio_base: u32,
    /// Highest kernel-space address.
    pub kernel_high: u32,
    /// Highest data segment address.
    pub data_segment_limit: u32,
    /// Highest text segment address.
    pub text_limit: u32,
    /// Lowest address the stack may grow to (exclusive).
    pub stack_limit: u32,
    /// Highest memory-mapped I/O address.
    pub mmio_limit: u32,
}

impl AddressLayout {
    /// Returns every address with its descriptive name, in canonical order.
    pub const fn named_addresses(&self) -> [(&'static str, u32); 16] {
        [
            (".text base address", self.text_base),
            ("data segment base address", self.data_segment_base),
            (".extern base address", self.extern_base),
            ("global pointer (gp)", self.global_pointer),
            (".data base address", self.data_base),
            ("heap base address", self.heap_base),
            ("stack pointer (sp)", self.stack_pointer),
            ("stack base address", self.stack_base),
            ("user space high address", self.user_high),
            ("kernel space base address", self.kernel_base),
            ("MMIO base address", self.mmio_base),
            ("kernel space high address", self.kernel_high),
            ("data segment limit address", self.data_segment_limit),
            ("text limit address", self.text_limit),
            ("stack limit address", self.stack_limit),
            ("memory map limit address", self.mmio_limit),
        ]
    }
}

impl Default for AddressLayout {
    fn default() -> Self {
        LayoutPreset::Default.layout()
    }
}

impl fmt::Display for AddressLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, address) in self.named_addresses() {
            writeln!(f, "{address:#010x}  {name}")?;
        }
        Ok(())
    }
}

/// Catalog of selectable address layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum LayoutPreset {
    /// SPIM-like 32-bit layout with text at `0x00400000`.
    #[default]
    #[serde(alias = "default")]
    Default,
    /// Compact 16-bit-addressable layout with data at address 0.
    #[serde(alias = "compact_data_at_zero", alias = "CompactDataAtAddress0")]
    CompactDataAtZero,
    /// Compact 16-bit-addressable layout with text at address 0.
    #[serde(alias = "compact_text_at_zero", alias = "CompactTextAtAddress0")]
    CompactTextAtZero,
}

impl LayoutPreset {
    /// Every preset, in display order.
    pub const ALL: [Self; 3] = [
        Self::Default,
        Self::CompactDataAtZero,
        Self::CompactTextAtZero,
    ];

    /// Returns the short identifier used in configuration files.
    pub const fn identifier(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::CompactDataAtZero => "CompactDataAtZero",
            Self::CompactTextAtZero => "CompactTextAtZero",
        }
    }

    /// Returns a human readable description.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Default => "Default",
            Self::CompactDataAtZero => "Compact, Data at Address 0",
            Self::CompactTextAtZero => "Compact, Text at Address 0",
        }
    }

    /// Returns the addresses of this preset.
    pub const fn layout(self) -> AddressLayout {
        match self {
            Self::Default => AddressLayout {
                text_base: 0x0040_0000,
                data_segment_base: 0x1000_0000,
                extern_base: 0x1000_0000,
                global_pointer: 0x1000_8000,
                data_base: 0x1001_0000,
                heap_base: 0x1004_0000,
                stack_pointer: 0x7fff_effc,
                stack_base: 0x7fff_fffc,
                user_high: 0x7fff_ffff,
                kernel_base: 0x8000_0000,
                mmio_base: 0xffff_0000,
                kernel_high: 0xffff_ffff,
                data_segment_limit: 0x7fff_ffff,
                text_limit: 0x0fff_fffc,
                stack_limit: 0x1004_0000,
                mmio_limit: 0xffff_ffff,
            },
            Self::CompactDataAtZero => AddressLayout {
                text_base: 0x0000_3000,
                data_segment_base: 0x0000_0000,
                extern_base: 0x0000_1000,
                global_pointer: 0x0000_1800,
                data_base: 0x0000_0000,
                heap_base: 0x0000_2000,
                stack_pointer: 0x0000_2ffc,
                stack_base: 0x0000_2ffc,
                user_high: 0x0000_3fff,
                kernel_base: 0x0000_4000,
                mmio_base: 0x0000_7f00,
                kernel_high: 0x0000_7fff,
                data_segment_limit: 0x0000_2fff,
                text_limit: 0x0000_3ffc,
                stack_limit: 0x0000_2000,
                mmio_limit: 0x0000_7fff,
            },
            Self::CompactTextAtZero => AddressLayout {
                text_base: 0x0000_0000,
                data_segment_base: 0x0000_2000,
                extern_base: 0x0000_2000,
                global_pointer: 0x0000_1800,
                data_base: 0x0000_2000,
                heap_base: 0x0000_3000,
                stack_pointer: 0x0000_3ffc,
                stack_base: 0x0000_3ffc,
                user_high: 0x0000_3fff,
                kernel_base: 0x0000_4000,
                mmio_base: 0x0000_7f00,
                kernel_high: 0x0000_7fff,
                data_segment_limit: 0x0000_3fff,
                text_limit: 0x0000_1ffc,
                stack_limit: 0x0000_3000,
                mmio_limit: 0x0000_7fff,
            },
        }
    }
}

impl fmt::Display for LayoutPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl FromStr for LayoutPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|preset| {
                preset.identifier().eq_ignore_ascii_case(s)
                    || preset.description().eq_ignore_ascii_case(s)
            })
            .ok_or_else(|| ConfigError::UnknownLayout(s.to_owned()))
    }
}
