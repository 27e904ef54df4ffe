//! Trap Handling Logic.
//!
//! This module implements trap entry for the user-level trap model. It performs the
//! following:
//! 1. **Trap Entry:** Writes `ucause`, `uepc`, and `utval`, then redirects to the handler at
//!    `utvec` if user interrupts are enabled and a handler is installed there.
//! 2. **Interrupt Entry:** As above, with the interrupt bit set in `ucause` and optional
//!    vectored dispatch.
//! 3. **Servicing:** Takes at most one pending event per call, in priority order external,
//!    software, timer, then synchronous trap, and mirrors still-pending interrupts into `uip`.
//!
//! Returning from a handler (`uret`) is an instruction and lives with the executor.

use std::sync::Arc;

use tracing::{debug, warn};

use super::arch::csr;
use super::state::MachineState;
use crate::common::constants::{
    CAUSE_INTERRUPT_BIT, EXTERNAL_INTERRUPT, INTERRUPT_ENABLE, PREVIOUS_INTERRUPT_ENABLE,
    SOFTWARE_INTERRUPT, TIMER_INTERRUPT,
};
use crate::common::{Exception, ExceptionCause};

/// Interrupt code of a user software interrupt.
pub const SOFTWARE_INTERRUPT_CODE: u32 = 0;

/// Interrupt code of a user timer interrupt.
pub const TIMER_INTERRUPT_CODE: u32 = 4;

/// Interrupt code of a user external interrupt.
pub const EXTERNAL_INTERRUPT_CODE: u32 = 8;

/// `utvec` mode bits selecting vectored interrupt dispatch.
const VECTORED_MODE: u64 = 0x1;

/// Event claimed by one call to [`MachineState::service_interrupts`].
#[derive(Debug)]
enum Serviced {
    External(u32),
    Software,
    Timer(u32),
    Trap(Exception, u32),
}

impl MachineState {
    /// Enters the trap handler for a synchronous exception.
    ///
    /// # Arguments
    ///
    /// * `exception` - The fault; its cause and trap value are written to the CSRs.
    /// * `pc` - Address of the faulting instruction, written to `uepc`.
    ///
    /// # Errors
    ///
    /// Returns the exception itself if user interrupts are disabled or no handler is
    /// installed at `utvec`; the run must then terminate.
    pub fn handle_trap(&mut self, exception: &Exception, pc: u32) -> Result<(), Exception> {
        let cause = exception
            .cause()
            .map_or(ExceptionCause::IllegalInstruction.code(), ExceptionCause::code);
        self.record_trap(cause, exception.trap_value(), pc);
        let base = self.handler_base();
        if self.enter_handler(base) {
            debug!(cause, pc, base, "trap entered");
            Ok(())
        } else {
            warn!(cause, pc, "no trap handler installed");
            Err(exception.clone())
        }
    }

    /// Enters the trap handler for an interrupt.
    ///
    /// # Arguments
    ///
    /// * `code` - Interrupt code (0 software, 4 timer, 8 external); the interrupt bit is
    ///   added when writing `ucause`.
    /// * `value` - Payload written to `utval`.
    /// * `pc` - Address of the next instruction to run, written to `uepc`.
    ///
    /// # Errors
    ///
    /// Returns an exit exception if no handler is installed at the target address.
    pub fn handle_interrupt(&mut self, code: u32, value: u32, pc: u32) -> Result<(), Exception> {
        self.record_trap(CAUSE_INTERRUPT_BIT | code, value, pc);
        let utvec = self.csrs.read_silent(csr::UTVEC).unwrap_or_default();
        let mut base = self.handler_base();
        if utvec & 0x3 == VECTORED_MODE {
            base = base.wrapping_add(4 * code);
        }
        if self.enter_handler(base) {
            debug!(code, value, pc, base, "interrupt entered");
            Ok(())
        } else {
            warn!(code, pc, "interrupt enabled but no handler installed");
            Err(Exception::Exiting {
                code: -1,
                message: Some(format!(
                    "interrupt handler was not supplied, but interrupt enable was high (cause {code})"
                )),
            })
        }
    }

    /// Takes the highest-priority pending event, if any.
    ///
    /// Called by the execution loop between instructions. Interrupts are only taken while
    /// `ustatus.UIE` is set and the matching `uie` bit is enabled; a pending synchronous
    /// trap is always taken when no interrupt is.
    ///
    /// # Returns
    ///
    /// `true` if control was transferred to a handler.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`MachineState::handle_trap`] and
    /// [`MachineState::handle_interrupt`].
    pub fn service_interrupts(&mut self) -> Result<bool, Exception> {
        let ustatus = self.csrs.read_silent(csr::USTATUS).unwrap_or_default();
        let uie = self.csrs.read_silent(csr::UIE).unwrap_or_default();
        let mut uip = self.csrs.read_silent(csr::UIP).unwrap_or_default();
        let enabled = ustatus & INTERRUPT_ENABLE != 0;
        let pc = self.registers.program_counter();

        // Only the claim happens under the controller lock; handler entry notifies register
        // observers, which may raise further events.
        let interrupts = Arc::clone(&self.interrupts);
        let event = {
            let mut channels = interrupts.lock();
            if enabled && channels.external_pending() && uie & EXTERNAL_INTERRUPT != 0 {
                Some(Serviced::External(channels.claim_external()))
            } else if enabled && uip & SOFTWARE_INTERRUPT != 0 && uie & SOFTWARE_INTERRUPT != 0 {
                Some(Serviced::Software)
            } else if enabled && channels.timer_pending() && uie & TIMER_INTERRUPT != 0 {
                Some(Serviced::Timer(channels.claim_timer()))
            } else if channels.trap_pending() {
                let (exception, trap_pc) = channels.claim_trap(pc);
                Some(Serviced::Trap(exception, trap_pc))
            } else {
                None
            }
        };

        match &event {
            Some(Serviced::External(value)) => {
                self.handle_interrupt(EXTERNAL_INTERRUPT_CODE, *value, pc)?;
                uip &= !EXTERNAL_INTERRUPT;
            }
            Some(Serviced::Software) => {
                self.handle_interrupt(SOFTWARE_INTERRUPT_CODE, 0, pc)?;
                uip &= !SOFTWARE_INTERRUPT;
            }
            Some(Serviced::Timer(value)) => {
                self.handle_interrupt(TIMER_INTERRUPT_CODE, *value, pc)?;
                uip &= !TIMER_INTERRUPT;
            }
            Some(Serviced::Trap(exception, trap_pc)) => {
                self.handle_trap(exception, *trap_pc)?;
                debug!(trap_pc = *trap_pc, "pending synchronous trap serviced");
            }
            None => {}
        }

        if interrupts.external_pending() {
            uip |= EXTERNAL_INTERRUPT;
        }
        if interrupts.timer_pending() {
            uip |= TIMER_INTERRUPT;
        }
        if self.csrs.read_silent(csr::UIP) != Some(uip) {
            let _ = self.csrs.write_backdoor(csr::UIP, uip);
        }
        Ok(event.is_some())
    }

    fn record_trap(&mut self, cause: u32, value: u32, pc: u32) {
        let _ = self.csrs.write(csr::UCAUSE, u64::from(cause));
        let _ = self.csrs.write(csr::UEPC, u64::from(pc));
        let _ = self.csrs.write(csr::UTVAL, u64::from(value));
    }

    fn handler_base(&self) -> u32 {
        (self.csrs.read_silent(csr::UTVEC).unwrap_or_default() as u32) & !0x3
    }

    /// Jumps to `base` if user interrupts are enabled and a handler is installed there.
    fn enter_handler(&mut self, base: u32) -> bool {
        let ustatus = self.csrs.read_silent(csr::USTATUS).unwrap_or_default();
        if ustatus & INTERRUPT_ENABLE == 0 {
            return false;
        }
        let installed = matches!(self.memory.get_statement_no_notify(base), Ok(Some(_)));
        if !installed {
            return false;
        }
        let _ = self.csrs.set_bits(csr::USTATUS, PREVIOUS_INTERRUPT_ENABLE);
        let _ = self.csrs.clear_bits(csr::USTATUS, INTERRUPT_ENABLE);
        let _ = self.registers.set_program_counter(base);
        true
    }
}
