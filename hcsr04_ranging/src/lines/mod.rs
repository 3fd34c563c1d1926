//! GPIO line collaborators.
//!
//! The controller needs two lines: an output that carries the trigger pulse
//! and an input whose edges are delivered to an [`EdgeSink`]. Backends provide
//! both through a [`LineProvider`]:
//!
//! - `simulation` - in-process lines with a delayed echo responder
//! - `rppal` - Raspberry Pi GPIO (feature `rppal`)

use crate::core::RangingCore;
use crate::dispatch::Dispatcher;
use crate::edge::IrqReturn;
use crate::error::LineError;
use std::fmt;
use std::sync::Arc;

pub mod simulation;

#[cfg(feature = "rppal")]
pub mod rppal;

/// Output line driving the sensor TRIG pin. Released on drop.
pub trait TriggerLine: Send {
    /// Line number.
    fn line(&self) -> u32;

    /// Drive the line.
    fn set_level(&mut self, high: bool) -> Result<(), LineError>;
}

/// Input line carrying the sensor ECHO pin. Released on drop.
pub trait EchoLine: Send {
    /// Line number.
    fn line(&self) -> u32;

    /// Interrupt id reported with this line's edges.
    fn interrupt_id(&self) -> u32;

    /// Deliver both edges of the line to `sink` until `unsubscribe`.
    fn subscribe(&mut self, sink: EdgeSink) -> Result<(), LineError>;

    /// Remove the subscription and wait for in-flight deliveries to finish.
    fn unsubscribe(&mut self) -> Result<(), LineError>;
}

/// Claims lines from a GPIO backend.
pub trait LineProvider: Send {
    /// Backend name.
    fn name(&self) -> &'static str;

    /// Claim `line` as an output, driven low.
    fn claim_trigger(&mut self, line: u32) -> Result<Box<dyn TriggerLine>, LineError>;

    /// Claim `line` as an input.
    fn claim_echo(&mut self, line: u32) -> Result<Box<dyn EchoLine>, LineError>;
}

/// Edge context entry point handed to an [`EchoLine`].
#[derive(Clone)]
pub struct EdgeSink {
    core: Arc<RangingCore>,
    dispatcher: Arc<dyn Dispatcher>,
    irq: u32,
}

impl EdgeSink {
    pub fn new(core: Arc<RangingCore>, dispatcher: Arc<dyn Dispatcher>, irq: u32) -> Self {
        Self {
            core,
            dispatcher,
            irq,
        }
    }

    /// Interrupt id this sink reports.
    pub fn irq(&self) -> u32 {
        self.irq
    }

    /// Report one edge. Never blocks beyond the record lock.
    pub fn edge(&self) -> IrqReturn {
        self.core.on_echo_edge(self.irq, &*self.dispatcher)
    }
}

impl fmt::Debug for EdgeSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeSink").field("irq", &self.irq).finish()
    }
}
