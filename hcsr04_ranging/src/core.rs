//! Ranging core.
//!
//! `RangingCore` owns the controller record, the readiness gate and the
//! trigger line. Its handlers are entered from the three execution contexts
//! and from the caller API; all of them serialise on the record lock. The
//! core never schedules work itself: every handler takes the [`Dispatcher`]
//! of the runtime it is running under.

use crate::clock::Clock;
use crate::dispatch::Dispatcher;
use crate::edge::{self, IrqReturn};
use crate::error::RangingError;
use crate::gate::{Readiness, ReadinessGate};
use crate::lines::TriggerLine;
use crate::machine;
use crate::phase::{self, PhaseAction};
use crate::record::{ControllerRecord, ControllerState, Evidence, LineConfig};
use crate::report::RangingReport;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Shared state of one ranging device.
pub struct RangingCore {
    record: Mutex<ControllerRecord>,
    gate: ReadinessGate,
    trigger: Mutex<Box<dyn TriggerLine>>,
    clock: Arc<dyn Clock>,
    blocking: bool,
}

impl RangingCore {
    /// Build a core in `Idle` with a READY gate.
    pub fn new(
        gpio: LineConfig,
        trigger: Box<dyn TriggerLine>,
        clock: Arc<dyn Clock>,
        blocking: bool,
    ) -> Self {
        Self {
            record: Mutex::new(ControllerRecord::new(gpio)),
            gate: ReadinessGate::new(),
            trigger: Mutex::new(trigger),
            clock,
            blocking,
        }
    }

    /// Line configuration.
    pub fn gpio(&self) -> LineConfig {
        self.record.lock().gpio
    }

    /// Whether `read_result` waits for the cycle to finish.
    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    // ─── Execution context handlers ─────────────────────────────────

    /// Controller context: one state machine step.
    ///
    /// The pending phase arming is cancelled before the next one is armed, and
    /// both happen before the lock is dropped.
    pub fn run_controller(&self, dispatcher: &dyn Dispatcher) {
        let mut record = self.record.lock();
        let step = machine::step(&mut record);
        if step.cancel_pending && dispatcher.cancel_phase() {
            trace!("Cancelled pending timeout in {:?}", step.from);
        }
        if let Some(delay) = step.arm {
            dispatcher.arm_phase(delay);
        }
    }

    /// Phase context: act on the state observed at firing time.
    pub fn run_phase(&self, dispatcher: &dyn Dispatcher) {
        let (observed, evidence) = {
            let record = self.record.lock();
            (record.state, record.evidence)
        };
        let action = phase::plan(observed);
        trace!("Phase firing in {:?}: {:?}", observed, action);

        match action {
            PhaseAction::DriveTrigger { high } => {
                // Line I/O outside the record lock. On failure the evidence
                // stays unset and the controller faults the cycle.
                let driven = match self.trigger.lock().set_level(high) {
                    Ok(()) => true,
                    Err(e) => {
                        error!("Failed to drive trigger {}: {}", level_name(high), e);
                        false
                    }
                };
                let mut record = self.record.lock();
                let schedule = if driven {
                    phase::confirm_trigger(&mut record, observed, high)
                } else {
                    record.state == observed
                };
                if schedule {
                    dispatcher.schedule_controller();
                }
            }
            PhaseAction::CheckTimeout => {
                let mut record = self.record.lock();
                if phase::check_timeout(&mut record) {
                    debug!("Echo timeout after {} us", record.gpio.timeout_us);
                    dispatcher.schedule_controller();
                }
            }
            PhaseAction::ReleaseGate => {
                // Faulted mid-pulse: the line is still high.
                if evidence.contains(Evidence::TRIGGER_HI)
                    && !evidence.contains(Evidence::TRIGGER_LO)
                {
                    if let Err(e) = self.trigger.lock().set_level(false) {
                        warn!("Failed to return trigger low: {}", e);
                    }
                }
                self.gate.release();
                debug!("Ranging cycle finished in {:?}", observed);
            }
            PhaseAction::Nothing => {}
        }
    }

    /// Edge context: capture one echo edge reported for `irq`.
    pub fn on_echo_edge(&self, irq: u32, dispatcher: &dyn Dispatcher) -> IrqReturn {
        let mut record = self.record.lock();
        let handled = edge::capture_edge(&mut record, irq, || self.clock.now());
        if handled == IrqReturn::Handled {
            dispatcher.schedule_controller();
        }
        handled
    }

    // ─── Caller API ─────────────────────────────────────────────────

    /// Begin a cycle.
    ///
    /// # Errors
    ///
    /// - `BadState` if the previous result was never acknowledged by `reset`.
    /// - `Conflict` if a cycle is outstanding. Nothing is mutated.
    pub fn start(&self, dispatcher: &dyn Dispatcher) -> Result<(), RangingError> {
        let mut record = self.record.lock();
        let state = record.state;
        if state.is_terminal() {
            warn!("Start rejected: result in {:?} not acknowledged", state);
            return Err(RangingError::BadState { state });
        }
        if state != ControllerState::Idle {
            return Err(RangingError::Conflict { state });
        }

        self.gate.acquire_busy(state)?;
        record.state = ControllerState::Requested;
        dispatcher.schedule_controller();
        info!("Ranging cycle requested");
        Ok(())
    }

    /// Acknowledge a result and return to `Idle`.
    ///
    /// # Errors
    ///
    /// `Conflict` while a cycle is in flight or its gate is still BUSY.
    pub fn reset(&self) -> Result<(), RangingError> {
        let mut record = self.record.lock();
        let state = record.state;
        if state.is_in_flight() || self.gate.is_busy() {
            return Err(RangingError::Conflict { state });
        }
        record.state = ControllerState::Idle;
        debug!("Ranging controller reset from {:?}", state);
        Ok(())
    }

    /// Read the result in the configured blocking mode.
    pub fn read_result(&self) -> RangingReport {
        self.read_result_with(self.blocking)
    }

    /// Read the result, waiting for the gate if `blocking`.
    pub fn read_result_with(&self, blocking: bool) -> RangingReport {
        if !self.gate.await_ready(blocking) {
            return RangingReport::in_progress();
        }
        RangingReport::from_record(&self.record.lock())
    }

    /// Copy of the record for inspection.
    pub fn snapshot(&self) -> ControllerRecord {
        self.record.lock().clone()
    }

    /// Current gate value.
    pub fn readiness(&self) -> Readiness {
        self.gate.readiness()
    }

    /// Leave the gate READY so no reader stays blocked on a released device.
    pub(crate) fn force_ready(&self) {
        self.gate.release();
    }
}

fn level_name(high: bool) -> &'static str {
    if high { "high" } else { "low" }
}

// ─── Tests ──────────────────────────────────────────────────────────
