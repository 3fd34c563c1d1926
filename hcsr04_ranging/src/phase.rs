//! Phase executor decisions.
//!
//! The phase executor is the only code that drives the trigger line. It reads
//! the state under the lock, performs line I/O outside it, then re-takes the
//! lock to record the confirming evidence.

use crate::record::{ControllerRecord, ControllerState, Evidence};

/// What a phase firing does for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseAction {
    /// Drive the trigger line to `high`.
    DriveTrigger {
        /// Target level
        high: bool,
    },
    /// Timeout deadline reached: check whether the echo rose.
    CheckTimeout,
    /// Cycle finished: release the readiness gate.
    ReleaseGate,
    /// Stale firing.
    Nothing,
}

/// Decide the action for a firing observed in `state`.
pub fn plan(state: ControllerState) -> PhaseAction {
    match state {
        ControllerState::TriggerHi => PhaseAction::DriveTrigger { high: true },
        ControllerState::TriggerLo => PhaseAction::DriveTrigger { high: false },
        ControllerState::Triggered => PhaseAction::CheckTimeout,
        ControllerState::Completed | ControllerState::TimedOut | ControllerState::Invalid => {
            PhaseAction::ReleaseGate
        }
        ControllerState::Idle | ControllerState::Requested => PhaseAction::Nothing,
    }
}

/// Record that the trigger reached `high`.
///
/// Only applies if the record is still in `planned`, the state observed
/// before the line was driven. Returns `true` when the controller should run.
pub fn confirm_trigger(record: &mut ControllerRecord, planned: ControllerState, high: bool) -> bool {
    if record.state != planned {
        return false;
    }
    record.evidence |= if high {
        Evidence::TRIGGER_HI
    } else {
        Evidence::TRIGGER_LO
    };
    true
}

/// Timeout firing. Sets `TIMEOUT` unless the echo already rose.
///
/// Returns `true` when the controller should run.
pub fn check_timeout(record: &mut ControllerRecord) -> bool {
    if record.state != ControllerState::Triggered
        || record.evidence.contains(Evidence::ECHO_RISE)
    {
        return false;
    }
    record.evidence |= Evidence::TIMEOUT;
    true
}

// ─── Tests ──────────────────────────────────────────────────────────
