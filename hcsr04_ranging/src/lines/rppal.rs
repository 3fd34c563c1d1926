//! Raspberry Pi GPIO lines through `rppal`.
//!
//! Line numbers are BCM GPIO numbers. Echo edges are delivered from rppal's
//! asynchronous interrupt thread, which plays the edge context.

use super::{EchoLine, EdgeSink, LineProvider, TriggerLine};
use crate::error::LineError;
use rppal::gpio::{Error as GpioError, Gpio, InputPin, OutputPin, Pin, Trigger};
use tracing::{debug, info, warn};

fn gpio_error(e: GpioError) -> LineError {
    LineError::Gpio(e.to_string())
}

fn bcm_pin(line: u32) -> Result<u8, LineError> {
    u8::try_from(line).map_err(|_| LineError::Unavailable { line })
}

/// Raspberry Pi GPIO backend.
pub struct RppalLines {
    gpio: Gpio,
}

impl RppalLines {
    /// Open the GPIO peripheral.
    pub fn new() -> Result<Self, LineError> {
        let gpio = Gpio::new().map_err(gpio_error)?;
        info!("rppal GPIO backend opened");
        Ok(Self { gpio })
    }

    fn pin(&self, line: u32) -> Result<Pin, LineError> {
        let pin = bcm_pin(line)?;
        self.gpio.get(pin).map_err(|e| match e {
            GpioError::PinNotAvailable(_) => LineError::Unavailable { line },
            GpioError::PinUsed(_) => LineError::Busy { line },
            other => gpio_error(other),
        })
    }
}

impl LineProvider for RppalLines {
    fn name(&self) -> &'static str {
        "rppal"
    }

    fn claim_trigger(&mut self, line: u32) -> Result<Box<dyn TriggerLine>, LineError> {
        let mut pin = self.pin(line)?.into_output();
        pin.set_low();
        debug!("GPIO{} claimed as trigger output", line);
        Ok(Box::new(RppalTrigger { line, pin }))
    }

    fn claim_echo(&mut self, line: u32) -> Result<Box<dyn EchoLine>, LineError> {
        let pin = self.pin(line)?.into_input();
        debug!("GPIO{} claimed as echo input", line);
        Ok(Box::new(RppalEcho {
            line,
            pin,
            subscribed: false,
        }))
    }
}

struct RppalTrigger {
    line: u32,
    pin: OutputPin,
}

impl TriggerLine for RppalTrigger {
    fn line(&self) -> u32 {
        self.line
    }

    fn set_level(&mut self, high: bool) -> Result<(), LineError> {
        if high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}

struct RppalEcho {
    line: u32,
    pin: InputPin,
    subscribed: bool,
}

impl EchoLine for RppalEcho {
    fn line(&self) -> u32 {
        self.line
    }

    fn interrupt_id(&self) -> u32 {
        self.line
    }

    fn subscribe(&mut self, sink: EdgeSink) -> Result<(), LineError> {
        if self.subscribed {
            return Err(LineError::AlreadySubscribed { line: self.line });
        }
        self.pin
            .set_async_interrupt(Trigger::Both, move |_level| {
                sink.edge();
            })
            .map_err(gpio_error)?;
        self.subscribed = true;
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<(), LineError> {
        if !self.subscribed {
            return Ok(());
        }
        // Joins rppal's interrupt thread, so no delivery is in flight afterwards.
        self.pin.clear_async_interrupt().map_err(gpio_error)?;
        self.subscribed = false;
        Ok(())
    }
}

impl Drop for RppalEcho {
    fn drop(&mut self) {
        if let Err(e) = self.unsubscribe() {
            warn!("Failed to clear echo interrupt on line {}: {}", self.line, e);
        }
    }
}
