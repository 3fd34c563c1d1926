//! Controller state machine.
//!
//! [`step`] interprets the evidence accumulated in the record and decides the
//! next state plus what the phase executor should do next. It never touches a
//! line and never blocks; the caller applies the returned [`Step`] while still
//! holding the record lock.
//!
//! ```text
//! Idle → Requested → TriggerHi → TriggerLo → Triggered ─┬→ Completed
//!                        │           │           │      ├→ TimedOut
//!                        └───────────┴───────────┴──────┴→ Invalid
//! ```
//!
//! Edges can be captured before the controller has run its `TriggerLo` step
//! when several run requests coalesce. That step then evaluates the echo
//! evidence the same way `Triggered` does.

use crate::record::{ControllerRecord, ControllerState, Evidence};
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of one controller step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// State before the step.
    pub from: ControllerState,
    /// State after the step.
    pub to: ControllerState,
    /// Cancel the pending phase arming before applying `arm`.
    pub cancel_pending: bool,
    /// Arm the phase executor after this delay.
    pub arm: Option<Duration>,
}

impl Step {
    fn hold(state: ControllerState) -> Self {
        Self {
            from: state,
            to: state,
            cancel_pending: false,
            arm: None,
        }
    }

    fn advance(from: ControllerState, to: ControllerState, delay: Duration) -> Self {
        Self {
            from,
            to,
            cancel_pending: false,
            arm: Some(delay),
        }
    }

    /// True if the state changed.
    pub fn is_transition(&self) -> bool {
        self.from != self.to
    }
}

/// Run one controller step on the record.
pub fn step(record: &mut ControllerRecord) -> Step {
    let from = record.state;
    let evidence = record.evidence;

    let step = match from {
        // Nothing to arbitrate. Terminal states are left only by reset, and
        // late evidence (a spurious edge after a timeout) must not change them.
        ControllerState::Idle
        | ControllerState::Completed
        | ControllerState::TimedOut
        | ControllerState::Invalid => Step::hold(from),

        ControllerState::Requested => {
            record.clear_cycle();
            Step::advance(from, ControllerState::TriggerHi, Duration::ZERO)
        }

        // An echo edge while the pulse is still high is a fault.
        ControllerState::TriggerHi => {
            if evidence.contains(Evidence::TRIGGER_HI)
                && !evidence.contains(Evidence::ECHO_RISE)
            {
                Step::advance(from, ControllerState::TriggerLo, record.gpio.pulse_width())
            } else {
                fault(from, evidence)
            }
        }

        ControllerState::TriggerLo => {
            if !evidence.contains(Evidence::TRIGGER_LO) {
                fault(from, evidence)
            } else if evidence.contains(Evidence::ECHO_RISE) {
                // Edges captured after the pulse ended but before this step ran.
                echo_step(record, from)
            } else {
                Step::advance(from, ControllerState::Triggered, record.gpio.timeout())
            }
        }

        ControllerState::Triggered => {
            if evidence.contains(Evidence::TIMEOUT) {
                Step::advance(from, ControllerState::TimedOut, Duration::ZERO)
            } else if evidence.contains(Evidence::ECHO_RISE) {
                echo_step(record, from)
            } else {
                fault(from, evidence)
            }
        }
    };

    record.state = step.to;
    if step.is_transition() {
        debug!("Ranging state {:?} -> {:?}", step.from, step.to);
    }
    step
}

/// Echo rise seen: complete on the fall, otherwise wait in `Triggered`.
fn echo_step(record: &mut ControllerRecord, from: ControllerState) -> Step {
    if record.evidence.contains(Evidence::ECHO_FALL) {
        let range = &mut record.range;
        range.delta_time = range.end_time.saturating_since(range.start_time);
        Step {
            from,
            to: ControllerState::Completed,
            cancel_pending: true,
            arm: Some(Duration::ZERO),
        }
    } else {
        // Fall still outstanding: the timeout no longer applies.
        Step {
            from,
            to: ControllerState::Triggered,
            cancel_pending: true,
            arm: None,
        }
    }
}

/// Missing evidence: move to `Invalid` and let the phase executor release the gate.
fn fault(from: ControllerState, evidence: Evidence) -> Step {
    warn!(
        "Protocol fault in {:?}: evidence {:?} lacks the expected flag",
        from, evidence
    );
    Step::advance(from, ControllerState::Invalid, Duration::ZERO)
}

// ─── Tests ──────────────────────────────────────────────────────────
