//! Dispatch requests between the execution contexts.
//!
//! The handlers never call each other directly. They ask a [`Dispatcher`] to
//! run the controller step later or to arm the phase executor after a delay.
//! The threaded runtime and the deterministic stepper both implement it.

use std::time::Duration;

/// Scheduling seam between the edge, controller and phase contexts.
pub trait Dispatcher: Send + Sync {
    /// Request one run of the controller step.
    ///
    /// Requests made while a run is pending or in progress coalesce into a
    /// single re-run.
    fn schedule_controller(&self);

    /// Arm the phase executor to fire once after `delay`.
    ///
    /// Re-arming replaces any pending arming.
    fn arm_phase(&self, delay: Duration);

    /// Cancel a pending phase arming. Returns `true` if one was pending.
    fn cancel_phase(&self) -> bool;
}
