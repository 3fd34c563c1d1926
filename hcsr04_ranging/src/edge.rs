//! Echo edge capture.
//!
//! Runs in the edge context under the record lock: timestamp, one flag, and
//! the caller requests a controller run when the edge was handled.

use crate::record::{ControllerRecord, Evidence, Timestamp};
use tracing::trace;

/// Whether an edge delivery was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// Not ours, outside a cycle, or both edges already captured.
    None,
    /// A new evidence flag was set.
    Handled,
}

/// Record one echo edge.
///
/// The first edge of a cycle is taken as the rise and the second as the fall,
/// whatever the electrical direction. `now` is only sampled when the edge is
/// captured.
pub fn capture_edge(
    record: &mut ControllerRecord,
    irq: u32,
    now: impl FnOnce() -> Timestamp,
) -> IrqReturn {
    if irq != record.gpio.echo_irq || !record.state.is_in_flight() {
        return IrqReturn::None;
    }

    if !record.evidence.contains(Evidence::ECHO_RISE) {
        record.range.start_time = now();
        record.evidence |= Evidence::ECHO_RISE;
        trace!("Echo rise at {:?}", record.range.start_time);
        IrqReturn::Handled
    } else if !record.evidence.contains(Evidence::ECHO_FALL) {
        record.range.end_time = now();
        record.evidence |= Evidence::ECHO_FALL;
        trace!("Echo fall at {:?}", record.range.end_time);
        IrqReturn::Handled
    } else {
        IrqReturn::None
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
