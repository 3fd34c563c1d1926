//! Deterministic single-threaded executor.
//!
//! Runs the same core handlers as the threaded runtime, but from the calling
//! thread and against a [`ManualClock`]. Phase deadlines fire only when virtual
//! time is advanced past them, so whole cycles can be replayed edge by edge.

use crate::clock::{Clock, ManualClock};
use crate::core::RangingCore;
use crate::dispatch::Dispatcher;
use crate::edge::IrqReturn;
use crate::error::RangingError;
use crate::gate::Readiness;
use crate::lines::{EchoLine, LineProvider, TriggerLine};
use crate::record::{ControllerRecord, ControllerState, LineConfig, Timestamp};
use crate::report::RangingReport;
use hcsr04_common::ranging::RangingParams;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct Pending {
    controller: bool,
    phase_at: Option<Timestamp>,
}

/// [`Dispatcher`] that queues requests for the stepper.
#[derive(Debug)]
pub struct StepQueue {
    clock: Arc<ManualClock>,
    pending: Mutex<Pending>,
}

impl StepQueue {
    fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            pending: Mutex::new(Pending::default()),
        }
    }

    fn take_controller(&self) -> bool {
        std::mem::take(&mut self.pending.lock().controller)
    }

    fn take_due_phase(&self) -> bool {
        let now = self.clock.now();
        let mut pending = self.pending.lock();
        match pending.phase_at {
            Some(at) if at <= now => {
                pending.phase_at = None;
                true
            }
            _ => false,
        }
    }

    /// Pending phase deadline.
    pub fn phase_deadline(&self) -> Option<Timestamp> {
        self.pending.lock().phase_at
    }
}

impl Dispatcher for StepQueue {
    fn schedule_controller(&self) {
        self.pending.lock().controller = true;
    }

    fn arm_phase(&self, delay: Duration) {
        let at = self.clock.now().saturating_add(delay);
        self.pending.lock().phase_at = Some(at);
    }

    fn cancel_phase(&self) -> bool {
        self.pending.lock().phase_at.take().is_some()
    }
}

/// Steps one core through virtual time.
pub struct Stepper {
    core: Arc<RangingCore>,
    queue: StepQueue,
    clock: Arc<ManualClock>,
    irq: u32,
    _echo: Option<Box<dyn EchoLine>>,
}

impl Stepper {
    /// Stepper over an explicit trigger line, starting at `Timestamp::ZERO`.
    pub fn new(gpio: LineConfig, trigger: Box<dyn TriggerLine>, blocking: bool) -> Self {
        let clock = Arc::new(ManualClock::default());
        let core = Arc::new(RangingCore::new(
            gpio,
            trigger,
            Arc::clone(&clock) as Arc<dyn Clock>,
            blocking,
        ));
        Self {
            core,
            queue: StepQueue::new(Arc::clone(&clock)),
            clock,
            irq: gpio.echo_irq,
            _echo: None,
        }
    }

    /// Stepper claiming both lines from `lines`.
    ///
    /// The echo line is held but not subscribed; edges are injected with
    /// [`Stepper::edge`].
    pub fn from_params(
        params: &RangingParams,
        lines: &mut dyn LineProvider,
    ) -> Result<Self, RangingError> {
        let trigger = lines.claim_trigger(params.trigger_line)?;
        let echo = lines.claim_echo(params.echo_line)?;
        let gpio = LineConfig {
            trigger_line: params.trigger_line,
            echo_line: params.echo_line,
            echo_irq: echo.interrupt_id(),
            pulse_width_us: params.pulse_width_us,
            timeout_us: params.timeout_us,
        };
        let mut stepper = Self::new(gpio, trigger, params.blocking);
        stepper._echo = Some(echo);
        Ok(stepper)
    }

    /// Run queued work due at the current virtual time until nothing is left.
    ///
    /// The controller always runs before a due phase firing.
    pub fn run_until_idle(&self) {
        loop {
            if self.queue.take_controller() {
                self.core.run_controller(&self.queue);
            } else if self.queue.take_due_phase() {
                self.core.run_phase(&self.queue);
            } else {
                break;
            }
        }
    }

    /// Advance virtual time by `by`, firing every deadline reached on the way
    /// at its own instant.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.now().saturating_add(by);
        loop {
            self.run_until_idle();
            match self.queue.phase_deadline() {
                Some(at) if at <= target => self.clock.set(at),
                _ => break,
            }
        }
        self.clock.set(target);
        self.run_until_idle();
    }

    /// Deliver one echo edge now and run the work it causes.
    pub fn edge(&self) -> IrqReturn {
        self.edge_on(self.irq)
    }

    /// Deliver one edge reported for `irq`.
    pub fn edge_on(&self, irq: u32) -> IrqReturn {
        let handled = self.core.on_echo_edge(irq, &self.queue);
        self.run_until_idle();
        handled
    }

    pub fn start(&self) -> Result<(), RangingError> {
        self.core.start(&self.queue)?;
        self.run_until_idle();
        Ok(())
    }

    pub fn reset(&self) -> Result<(), RangingError> {
        self.core.reset()
    }

    /// Non-blocking read; a blocking read would never return on one thread.
    pub fn read_result(&self) -> RangingReport {
        self.core.read_result_with(false)
    }

    pub fn state(&self) -> ControllerState {
        self.core.snapshot().state
    }

    pub fn snapshot(&self) -> ControllerRecord {
        self.core.snapshot()
    }

    pub fn readiness(&self) -> Readiness {
        self.core.readiness()
    }

    /// Current virtual time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Pending phase deadline, if armed.
    pub fn phase_deadline(&self) -> Option<Timestamp> {
        self.queue.phase_deadline()
    }
}
