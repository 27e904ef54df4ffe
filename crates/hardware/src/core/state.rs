//! Machine State.
//!
//! `MachineState` owns everything a running program can observe: memory, the three register
//! files, and a handle to the interrupt controller. There are no global instances; each
//! state is built from a [`MachineConfig`], so independent machines can coexist.
//!
//! `Machine` is the shared form used when tools or device models run on other threads. It
//! puts the state behind a single mutex (the machine lock) and keeps the interrupt
//! controller, whose own lock is independent, reachable without taking it.

use std::fmt;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::config::MachineConfig;
use crate::core::arch::{ControlAndStatusRegisterFile, FloatingPointRegisterFile, RegisterFile};
use crate::sim::undo::UndoRecorder;
use crate::soc::interrupts::InterruptController;
use crate::soc::memory::Memory;
use crate::soc::memory::layout::{AddressLayout, LayoutPreset};

/// Memory, registers, and interrupt signaling of one hart.
pub struct MachineState {
    config: MachineConfig,
    pub(crate) memory: Memory,
    pub(crate) registers: RegisterFile,
    pub(crate) fp_registers: FloatingPointRegisterFile,
    pub(crate) csrs: ControlAndStatusRegisterFile,
    pub(crate) interrupts: Arc<InterruptController>,
    undo: Option<Arc<dyn UndoRecorder>>,
}

impl MachineState {
    /// Builds a machine in its reset state.
    pub fn new(config: &MachineConfig) -> Self {
        let layout = config.memory.layout.layout();
        let mut memory = Memory::new(layout);
        memory.set_self_modifying_code(config.memory.self_modifying_code);
        debug!(layout = %config.memory.layout, "machine state created");
        Self {
            config: *config,
            memory,
            registers: RegisterFile::new(&layout),
            fp_registers: FloatingPointRegisterFile::new(),
            csrs: ControlAndStatusRegisterFile::new(),
            interrupts: Arc::new(InterruptController::new()),
            undo: None,
        }
    }

    /// The configuration the machine currently runs with.
    pub const fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// The active address layout.
    pub const fn layout(&self) -> &AddressLayout {
        self.memory.layout()
    }

    /// Memory.
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Mutable memory.
    pub const fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Integer registers and program counter.
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Mutable integer registers and program counter.
    pub const fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// Floating-point registers.
    pub const fn fp_registers(&self) -> &FloatingPointRegisterFile {
        &self.fp_registers
    }

    /// Mutable floating-point registers.
    pub const fn fp_registers_mut(&mut self) -> &mut FloatingPointRegisterFile {
        &mut self.fp_registers
    }

    /// Control and status registers.
    pub const fn csrs(&self) -> &ControlAndStatusRegisterFile {
        &self.csrs
    }

    /// Mutable control and status registers.
    pub const fn csrs_mut(&mut self) -> &mut ControlAndStatusRegisterFile {
        &mut self.csrs
    }

    /// The interrupt controller shared with event sources.
    pub const fn interrupts(&self) -> &Arc<InterruptController> {
        &self.interrupts
    }

    /// Switches to another layout preset.
    ///
    /// All memory contents are discarded and every register returns to its reset value,
    /// with `sp`, `gp`, and `pc` re-seeded from the new layout.
    pub fn set_layout(&mut self, preset: LayoutPreset) {
        let layout = preset.layout();
        self.config.memory.layout = preset;
        self.memory.reconfigure(layout);
        self.registers.change_reset_values(&layout);
        self.reset_registers();
        debug!(layout = %preset, "layout changed");
    }

    /// Enables or disables self-modifying code.
    pub fn set_self_modifying_code(&mut self, enabled: bool) {
        self.config.memory.self_modifying_code = enabled;
        self.memory.set_self_modifying_code(enabled);
    }

    /// Enables or disables starting at the `main` label.
    pub const fn set_start_at_main(&mut self, enabled: bool) {
        self.config.registers.start_at_main = enabled;
    }

    /// Clears memory, resets every register, and idles every interrupt channel.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.reset_registers();
        self.interrupts.reset();
        debug!("machine state reset");
    }

    fn reset_registers(&mut self) {
        self.registers.reset();
        self.fp_registers.reset();
        self.csrs.reset();
    }

    /// Substitutes another memory wholesale, returning the one in use.
    ///
    /// Used for sandboxed execution; swap the original back in to restore it.
    pub fn swap_memory(&mut self, memory: Memory) -> Memory {
        debug!("memory swapped");
        mem::replace(&mut self.memory, memory)
    }

    /// Installs (or removes) the backstep recorder on memory and all register files.
    pub fn set_undo_recorder(&mut self, recorder: Option<Arc<dyn UndoRecorder>>) {
        self.memory.set_undo_recorder(recorder.clone());
        self.registers.set_undo_recorder(recorder.clone());
        self.fp_registers.set_undo_recorder(recorder.clone());
        self.csrs.set_undo_recorder(recorder.clone());
        self.undo = recorder;
    }

    /// Returns `true` if a backstep recorder is installed.
    pub const fn has_undo_recorder(&self) -> bool {
        self.undo.is_some()
    }

    /// Places the program counter before a run.
    ///
    /// # Arguments
    ///
    /// * `main` - Address of the `main` label, if the program defines one.
    ///
    /// # Returns
    ///
    /// The chosen start address: `main` when starting at main is enabled and `main` lies in
    /// the text segment, otherwise the text base.
    pub fn initialize_program_counter(&mut self, main: Option<u32>) -> u32 {
        let start = match main {
            Some(address)
                if self.config.registers.start_at_main
                    && self.memory.in_text_segment(address) =>
            {
                address
            }
            _ => self.registers.initial_program_counter(),
        };
        self.registers.initialize_program_counter(start);
        debug!(pc = start, "program counter initialized");
        start
    }

    /// Moves the state behind the machine lock for sharing with other threads.
    pub fn into_shared(self) -> Machine {
        let interrupts = Arc::clone(&self.interrupts);
        Machine {
            state: Arc::new(Mutex::new(self)),
            interrupts,
        }
    }
}

impl fmt::Debug for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MachineState")
            .field("config", &self.config)
            .field("memory", &self.memory)
            .field("registers", &self.registers)
            .field("interrupts", &self.interrupts)
            .finish_non_exhaustive()
    }
}

/// Shared handle to a machine state.
///
/// Cloning the handle shares the same state. Any thread touching memory or registers must
/// hold the machine lock for the whole read-modify-notify sequence.
#[derive(Clone, Debug)]
pub struct Machine {
    state: Arc<Mutex<MachineState>>,
    interrupts: Arc<InterruptController>,
}

impl Machine {
    /// Builds a shared machine from a configuration.
    pub fn new(config: &MachineConfig) -> Self {
        MachineState::new(config).into_shared()
    }

    /// Takes the machine lock.
    ///
    /// A poisoned lock is recovered; the state is plain data and stays consistent.
    pub fn lock(&self) -> MutexGuard<'_, MachineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with the machine lock held.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut MachineState) -> R) -> R {
        f(&mut self.lock())
    }

    /// The interrupt controller, reachable without the machine lock.
    pub const fn interrupts(&self) -> &Arc<InterruptController> {
        &self.interrupts
    }

    /// Suspends the calling thread until an interrupt channel is pending.
    ///
    /// Must be called without holding the machine lock.
    pub fn wait_for_interrupt(&self) {
        self.interrupts.wait_for_interrupt();
    }

    /// Like [`Machine::wait_for_interrupt`] but gives up after `timeout`.
    ///
    /// # Returns
    ///
    /// `true` if a channel became pending.
    pub fn wait_for_interrupt_timeout(&self, timeout: Duration) -> bool {
        self.interrupts.wait_for_interrupt_timeout(timeout)
    }
}
