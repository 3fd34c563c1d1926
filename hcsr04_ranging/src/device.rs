//! Device lifecycle.
//!
//! A [`RangingDevice`] binds a core to its lines and worker threads. A
//! [`DeviceSlot`] holds at most one device and maps the public `init`,
//! `release`, `start`, `reset` and `read_result` operations onto it.

use crate::clock::Clock;
use crate::contexts::{ExecutionContexts, ThreadDispatcher};
use crate::core::RangingCore;
use crate::error::RangingError;
use crate::gate::Readiness;
use crate::lines::{EchoLine, EdgeSink, LineProvider};
use crate::record::{ControllerRecord, LineConfig};
use crate::report::RangingReport;
use hcsr04_common::ranging::RangingParams;
use std::sync::Arc;
use tracing::{info, warn};

/// An initialised ranging device.
pub struct RangingDevice {
    core: Arc<RangingCore>,
    dispatcher: ThreadDispatcher,
    contexts: ExecutionContexts,
    echo: Box<dyn EchoLine>,
}

impl RangingDevice {
    /// Claim the lines, spawn the contexts and subscribe to echo edges.
    ///
    /// Anything acquired before a failing step is released again.
    pub fn init(
        params: &RangingParams,
        lines: &mut dyn LineProvider,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RangingError> {
        let trigger = lines.claim_trigger(params.trigger_line)?;
        let mut echo = lines.claim_echo(params.echo_line)?;

        let gpio = LineConfig {
            trigger_line: params.trigger_line,
            echo_line: params.echo_line,
            echo_irq: echo.interrupt_id(),
            pulse_width_us: params.pulse_width_us,
            timeout_us: params.timeout_us,
        };
        let core = Arc::new(RangingCore::new(gpio, trigger, clock, params.blocking));
        let contexts = ExecutionContexts::spawn(Arc::clone(&core))?;
        let dispatcher = contexts.dispatcher();

        let sink = EdgeSink::new(
            Arc::clone(&core),
            Arc::new(dispatcher.clone()),
            gpio.echo_irq,
        );
        echo.subscribe(sink)?;

        info!(
            "Ranging device on {} initialised: trigger {}, echo {} (irq {}), pulse {} us, timeout {} us",
            lines.name(),
            gpio.trigger_line,
            gpio.echo_line,
            gpio.echo_irq,
            gpio.pulse_width_us,
            gpio.timeout_us
        );
        Ok(Self {
            core,
            dispatcher,
            contexts,
            echo,
        })
    }

    /// Begin a ranging cycle.
    pub fn start(&self) -> Result<(), RangingError> {
        self.core.start(&self.dispatcher)
    }

    /// Acknowledge the last result.
    pub fn reset(&self) -> Result<(), RangingError> {
        self.core.reset()
    }

    /// Read the result in the configured blocking mode.
    pub fn read_result(&self) -> RangingReport {
        self.core.read_result()
    }

    /// Read the result with an explicit blocking mode.
    pub fn read_result_with(&self, blocking: bool) -> RangingReport {
        self.core.read_result_with(blocking)
    }

    /// Copy of the controller record.
    pub fn snapshot(&self) -> ControllerRecord {
        self.core.snapshot()
    }

    /// Current gate value.
    pub fn readiness(&self) -> Readiness {
        self.core.readiness()
    }

    /// Line configuration.
    pub fn gpio(&self) -> LineConfig {
        self.core.gpio()
    }

    fn quiesce(&mut self) {
        if let Err(e) = self.echo.unsubscribe() {
            warn!("Failed to remove echo subscription: {}", e);
        }
        self.contexts.shutdown();
        self.core.force_ready();
    }
}

impl Drop for RangingDevice {
    fn drop(&mut self) {
        self.quiesce();
    }
}

/// Holds at most one initialised device.
#[derive(Default)]
pub struct DeviceSlot {
    device: Option<RangingDevice>,
}

impl DeviceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise the device held by this slot.
    ///
    /// # Errors
    ///
    /// `AlreadyInitialized` if the slot is occupied, otherwise whatever
    /// [`RangingDevice::init`] reports.
    pub fn init(
        &mut self,
        params: &RangingParams,
        lines: &mut dyn LineProvider,
        clock: Arc<dyn Clock>,
    ) -> Result<&RangingDevice, RangingError> {
        if self.device.is_some() {
            return Err(RangingError::AlreadyInitialized);
        }
        let device = RangingDevice::init(params, lines, clock)?;
        Ok(&*self.device.insert(device))
    }

    /// Quiesce and drop the device. No-op on an empty slot.
    pub fn release(&mut self) {
        if let Some(device) = self.device.take() {
            drop(device);
            info!("Ranging device released");
        }
    }

    /// True while a device is held.
    pub fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    /// The held device.
    pub fn get(&self) -> Result<&RangingDevice, RangingError> {
        self.device.as_ref().ok_or(RangingError::NotInitialized)
    }

    pub fn start(&self) -> Result<(), RangingError> {
        self.get()?.start()
    }

    pub fn reset(&self) -> Result<(), RangingError> {
        self.get()?.reset()
    }

    pub fn read_result(&self) -> Result<RangingReport, RangingError> {
        Ok(self.get()?.read_result())
    }
}
