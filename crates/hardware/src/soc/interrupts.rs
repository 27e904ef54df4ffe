//! Interrupt Controller.
//!
//! The interrupt controller is the meeting point between the execution thread and
//! asynchronous event sources (device models, timer daemons, tools). It provides:
//! 1. **Channels:** Three independent single-slot channels for external interrupts, timer
//!    interrupts, and synchronous traps.
//! 2. **Admission control:** Registering on a channel that already holds an unclaimed event
//!    is rejected, so the source must retry or drop it.
//! 3. **Claim protocol:** Claiming an idle channel is a programming error and panics.
//! 4. **Wake-up:** A condition variable on the controller's own lock lets a `wfi` suspend
//!    the execution thread until any channel becomes pending.
//!
//! The controller's lock is independent of the machine lock; it is always safe to register
//! an event while holding or not holding the machine lock.

use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::common::Exception;
use crate::common::constants::INSTRUCTION_LENGTH;

#[derive(Debug, Default)]
struct Channels {
    external: Option<u32>,
    timer: Option<u32>,
    trap: Option<(Exception, u32)>,
}

impl Channels {
    const fn any_pending(&self) -> bool {
        self.external.is_some() || self.timer.is_some() || self.trap.is_some()
    }
}

/// Three-channel pending/claim state machine shared by the execution loop and event sources.
#[derive(Default)]
pub struct InterruptController {
    channels: Mutex<Channels>,
    wake: Condvar,
}

impl InterruptController {
    /// Creates a controller with every channel idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the channels for an atomic check-then-claim sequence.
    pub fn lock(&self) -> InterruptGuard<'_> {
        InterruptGuard {
            channels: self.channels.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Raises an external interrupt carrying a device-specific `value`.
    ///
    /// # Returns
    ///
    /// `false` if an external interrupt is already pending; the pending payload is kept.
    pub fn register_external_interrupt(&self, value: u32) -> bool {
        let mut channels = self.lock();
        if channels.channels.external.is_some() {
            debug!(value, "external interrupt rejected: channel busy");
            return false;
        }
        channels.channels.external = Some(value);
        drop(channels);
        debug!(value, "external interrupt registered");
        self.wake.notify_all();
        true
    }

    /// Raises a timer interrupt carrying `value`.
    ///
    /// # Returns
    ///
    /// `false` if a timer interrupt is already pending; the pending payload is kept.
    pub fn register_timer_interrupt(&self, value: u32) -> bool {
        let mut channels = self.lock();
        if channels.channels.timer.is_some() {
            debug!(value, "timer interrupt rejected: channel busy");
            return false;
        }
        channels.channels.timer = Some(value);
        drop(channels);
        debug!(value, "timer interrupt registered");
        self.wake.notify_all();
        true
    }

    /// Records a synchronous trap raised by the instruction at `pc`.
    ///
    /// # Arguments
    ///
    /// * `exception` - The fault to deliver.
    /// * `pc` - Address of the faulting instruction.
    ///
    /// # Returns
    ///
    /// `false` if a trap is already pending.
    pub fn register_synchronous_trap(&self, exception: Exception, pc: u32) -> bool {
        let mut channels = self.lock();
        if channels.channels.trap.is_some() {
            debug!(pc, "synchronous trap rejected: channel busy");
            return false;
        }
        debug!(pc, %exception, "synchronous trap registered");
        channels.channels.trap = Some((exception, pc));
        drop(channels);
        self.wake.notify_all();
        true
    }

    /// Returns `true` if an external interrupt is waiting to be claimed.
    pub fn external_pending(&self) -> bool {
        self.lock().external_pending()
    }

    /// Returns `true` if a timer interrupt is waiting to be claimed.
    pub fn timer_pending(&self) -> bool {
        self.lock().timer_pending()
    }

    /// Returns `true` if a synchronous trap is waiting to be claimed.
    pub fn trap_pending(&self) -> bool {
        self.lock().trap_pending()
    }

    /// Returns `true` if any channel is pending.
    pub fn any_pending(&self) -> bool {
        self.lock().any_pending()
    }

    /// Claims the pending external interrupt.
    ///
    /// # Panics
    ///
    /// Panics if no external interrupt is pending.
    pub fn claim_external(&self) -> u32 {
        self.lock().claim_external()
    }

    /// Claims the pending timer interrupt.
    ///
    /// # Panics
    ///
    /// Panics if no timer interrupt is pending.
    pub fn claim_timer(&self) -> u32 {
        self.lock().claim_timer()
    }

    /// Claims the pending synchronous trap.
    ///
    /// # Panics
    ///
    /// Panics if no trap is pending or if the trap was not raised by the instruction just
    /// before `current_pc`.
    pub fn claim_trap(&self, current_pc: u32) -> (Exception, u32) {
        self.lock().claim_trap(current_pc)
    }

    /// Clears every channel.
    pub fn reset(&self) {
        let mut channels = self.lock();
        *channels.channels = Channels::default();
        debug!("interrupt controller reset");
    }

    /// Blocks until at least one channel is pending.
    ///
    /// The caller must not hold the machine lock, or event sources that need it could
    /// never raise the interrupt being waited for.
    pub fn wait_for_interrupt(&self) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        while !channels.any_pending() {
            trace!("waiting for interrupt");
            channels = self
                .wake
                .wait(channels)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until a channel is pending or `timeout` elapses.
    ///
    /// # Returns
    ///
    /// `true` if a channel is pending on return.
    pub fn wait_for_interrupt_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        while !channels.any_pending() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .wake
                .wait_timeout(channels, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            channels = guard;
        }
        true
    }
}

impl fmt::Debug for InterruptController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.lock();
        f.debug_struct("InterruptController")
            .field("external", &guard.channels.external)
            .field("timer", &guard.channels.timer)
            .field("trap", &guard.channels.trap)
            .finish()
    }
}

/// Exclusive view of the channels, held across a check-then-claim sequence.
pub struct InterruptGuard<'a> {
    channels: MutexGuard<'a, Channels>,
}

impl InterruptGuard<'_> {
    /// Returns `true` if an external interrupt is pending.
    pub fn external_pending(&self) -> bool {
        self.channels.external.is_some()
    }

    /// Returns `true` if a timer interrupt is pending.
    pub fn timer_pending(&self) -> bool {
        self.channels.timer.is_some()
    }

    /// Returns `true` if a synchronous trap is pending.
    pub fn trap_pending(&self) -> bool {
        self.channels.trap.is_some()
    }

    /// Returns `true` if any channel is pending.
    pub fn any_pending(&self) -> bool {
        self.channels.any_pending()
    }

    /// Claims the pending external interrupt.
    ///
    /// # Panics
    ///
    /// Panics if no external interrupt is pending.
    pub fn claim_external(&mut self) -> u32 {
        let Some(value) = self.channels.external.take() else {
            panic!("claim_external called with no external interrupt pending");
        };
        debug!(value, "external interrupt claimed");
        value
    }

    /// Claims the pending timer interrupt.
    ///
    /// # Panics
    ///
    /// Panics if no timer interrupt is pending.
    pub fn claim_timer(&mut self) -> u32 {
        let Some(value) = self.channels.timer.take() else {
            panic!("claim_timer called with no timer interrupt pending");
        };
        debug!(value, "timer interrupt claimed");
        value
    }

    /// Claims the pending synchronous trap.
    ///
    /// # Arguments
    ///
    /// * `current_pc` - The claiming context's program counter, one instruction past the
    ///   faulting one.
    ///
    /// # Panics
    ///
    /// Panics if no trap is pending or if the recorded program counter does not match.
    pub fn claim_trap(&mut self, current_pc: u32) -> (Exception, u32) {
        let Some((exception, pc)) = self.channels.trap.take() else {
            panic!("claim_trap called with no synchronous trap pending");
        };
        assert_eq!(
            pc,
            current_pc.wrapping_sub(INSTRUCTION_LENGTH),
            "stale synchronous trap: recorded at {pc:#010x}, claimed at {current_pc:#010x}"
        );
        debug!(pc, "synchronous trap claimed");
        (exception, pc)
    }
}

impl fmt::Debug for InterruptGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptGuard")
            .field("channels", &*self.channels)
            .finish()
    }
}
