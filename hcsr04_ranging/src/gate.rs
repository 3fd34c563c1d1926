//! Readiness gate.
//!
//! A two-state completion signal: BUSY while a cycle is outstanding, READY
//! otherwise. Unlike a counting semaphore it can be awaited without being
//! consumed, so any number of readers may observe the same READY.

use crate::error::RangingError;
use crate::record::ControllerState;
use parking_lot::{Condvar, Mutex};

/// Gate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Readiness {
    /// No cycle outstanding; a result (if any) may be read.
    #[default]
    Ready,
    /// A cycle is outstanding.
    Busy,
}

/// READY/BUSY signal with blocking wait-for-ready.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    value: Mutex<Readiness>,
    changed: Condvar,
}

impl ReadinessGate {
    /// New gate in the READY state.
    pub fn new() -> Self {
        Self::default()
    }

    /// READY → BUSY.
    ///
    /// # Errors
    ///
    /// `RangingError::Conflict` if the gate is already BUSY. `observed` is
    /// only used to annotate the error.
    pub fn acquire_busy(&self, observed: ControllerState) -> Result<(), RangingError> {
        let mut value = self.value.lock();
        match *value {
            Readiness::Ready => {
                *value = Readiness::Busy;
                Ok(())
            }
            Readiness::Busy => Err(RangingError::Conflict { state: observed }),
        }
    }

    /// Wait for READY without consuming it.
    ///
    /// Non-blocking callers check once. Returns `true` when the gate is READY.
    pub fn await_ready(&self, blocking: bool) -> bool {
        let mut value = self.value.lock();
        if !blocking {
            return *value == Readiness::Ready;
        }
        while *value == Readiness::Busy {
            self.changed.wait(&mut value);
        }
        true
    }

    /// BUSY → READY and wake every waiter. Idempotent.
    pub fn release(&self) {
        let mut value = self.value.lock();
        if *value == Readiness::Busy {
            *value = Readiness::Ready;
            self.changed.notify_all();
        }
    }

    /// Current value.
    pub fn readiness(&self) -> Readiness {
        *self.value.lock()
    }

    /// Shorthand for `readiness() == Busy`.
    pub fn is_busy(&self) -> bool {
        self.readiness() == Readiness::Busy
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
