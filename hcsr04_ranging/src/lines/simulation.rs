//! Simulated GPIO lines.
//!
//! The trigger and echo lines share one in-process bus. Each high-to-low
//! transition of the trigger queues an echo pulse (rise after `delay`, fall
//! `pulse` later) that a responder thread delivers to the subscribed sink.
//! Without a configured pulse the sensor never answers.

use super::{EchoLine, EdgeSink, LineProvider, TriggerLine};
use crate::edge::IrqReturn;
use crate::error::LineError;
use hcsr04_common::ranging::BackendConfig;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Offset added to a line number to form its simulated interrupt id.
pub const SIM_IRQ_BASE: u32 = 200;

/// Simulated sensor response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoProfile {
    /// Trigger low to echo rise.
    pub delay: Duration,
    /// Echo width. `None` means no echo at all.
    pub pulse: Option<Duration>,
}

impl EchoProfile {
    /// Sensor that answers with a `pulse` wide echo after `delay`.
    pub fn echo(delay: Duration, pulse: Duration) -> Self {
        Self {
            delay,
            pulse: Some(pulse),
        }
    }

    /// Sensor that never answers.
    pub fn silent() -> Self {
        Self {
            delay: Duration::ZERO,
            pulse: None,
        }
    }

    /// Profile described by the `[backend]` section.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            delay: Duration::from_micros(config.echo_delay_us),
            pulse: config.echo_pulse_us.map(Duration::from_micros),
        }
    }
}

/// Echo edge queued by a trigger falling edge.
#[derive(Debug, Clone, Copy)]
struct PendingEdge {
    /// When this edge should be delivered
    at: Instant,
}

#[derive(Debug)]
struct SimBus {
    profile: EchoProfile,
    trigger_level: bool,
    trigger_history: Vec<bool>,
    sink: Option<EdgeSink>,
    responders: Vec<JoinHandle<()>>,
    claimed: HashSet<u32>,
    unavailable: HashSet<u32>,
}

impl SimBus {
    fn claim(&mut self, line: u32) -> Result<(), LineError> {
        if self.unavailable.contains(&line) {
            return Err(LineError::Unavailable { line });
        }
        if !self.claimed.insert(line) {
            return Err(LineError::Busy { line });
        }
        Ok(())
    }

    fn queue_echo(&mut self, from: Instant) {
        let Some(pulse) = self.profile.pulse else {
            trace!("Simulated sensor silent");
            return;
        };
        let Some(sink) = self.sink.clone() else {
            return;
        };

        let rise = PendingEdge {
            at: from + self.profile.delay,
        };
        let fall = PendingEdge {
            at: rise.at + pulse,
        };
        self.responders.retain(|handle| !handle.is_finished());
        let spawned = thread::Builder::new()
            .name("hcsr04-sim-echo".to_string())
            .spawn(move || {
                for edge in [rise, fall] {
                    let now = Instant::now();
                    if edge.at > now {
                        thread::sleep(edge.at - now);
                    }
                    sink.edge();
                }
            });
        match spawned {
            Ok(handle) => self.responders.push(handle),
            Err(e) => warn!("Failed to spawn simulated echo responder: {}", e),
        }
    }
}

/// In-process line backend.
#[derive(Debug, Clone)]
pub struct SimulatedLines {
    bus: Arc<Mutex<SimBus>>,
}

impl SimulatedLines {
    pub fn new(profile: EchoProfile) -> Self {
        Self {
            bus: Arc::new(Mutex::new(SimBus {
                profile,
                trigger_level: false,
                trigger_history: Vec::new(),
                sink: None,
                responders: Vec::new(),
                claimed: HashSet::new(),
                unavailable: HashSet::new(),
            })),
        }
    }

    /// Backend configured from the `[backend]` section.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(EchoProfile::from_config(config))
    }

    /// Make `line` fail to claim, as a missing or reserved GPIO would.
    pub fn with_unavailable(self, line: u32) -> Self {
        self.bus.lock().unavailable.insert(line);
        self
    }

    /// Inspection and fault injection handle sharing this bus.
    pub fn monitor(&self) -> SimMonitor {
        SimMonitor {
            bus: Arc::clone(&self.bus),
        }
    }
}

impl LineProvider for SimulatedLines {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn claim_trigger(&mut self, line: u32) -> Result<Box<dyn TriggerLine>, LineError> {
        let mut bus = self.bus.lock();
        bus.claim(line)?;
        bus.trigger_level = false;
        debug!("Simulated trigger line {} claimed", line);
        Ok(Box::new(SimTrigger {
            line,
            bus: Arc::clone(&self.bus),
        }))
    }

    fn claim_echo(&mut self, line: u32) -> Result<Box<dyn EchoLine>, LineError> {
        self.bus.lock().claim(line)?;
        debug!("Simulated echo line {} claimed", line);
        Ok(Box::new(SimEcho {
            line,
            bus: Arc::clone(&self.bus),
        }))
    }
}

struct SimTrigger {
    line: u32,
    bus: Arc<Mutex<SimBus>>,
}

impl TriggerLine for SimTrigger {
    fn line(&self) -> u32 {
        self.line
    }

    fn set_level(&mut self, high: bool) -> Result<(), LineError> {
        let mut bus = self.bus.lock();
        let falling = bus.trigger_level && !high;
        bus.trigger_level = high;
        bus.trigger_history.push(high);
        if falling {
            bus.queue_echo(Instant::now());
        }
        Ok(())
    }
}

impl Drop for SimTrigger {
    fn drop(&mut self) {
        let mut bus = self.bus.lock();
        bus.trigger_level = false;
        bus.claimed.remove(&self.line);
    }
}

struct SimEcho {
    line: u32,
    bus: Arc<Mutex<SimBus>>,
}

impl EchoLine for SimEcho {
    fn line(&self) -> u32 {
        self.line
    }

    fn interrupt_id(&self) -> u32 {
        SIM_IRQ_BASE + self.line
    }

    fn subscribe(&mut self, sink: EdgeSink) -> Result<(), LineError> {
        let mut bus = self.bus.lock();
        if bus.sink.is_some() {
            return Err(LineError::AlreadySubscribed { line: self.line });
        }
        bus.sink = Some(sink);
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<(), LineError> {
        let responders = {
            let mut bus = self.bus.lock();
            bus.sink = None;
            std::mem::take(&mut bus.responders)
        };
        // Responders deliver without the bus lock held, so joining is safe here.
        for handle in responders {
            if handle.join().is_err() {
                warn!("Simulated echo responder panicked");
            }
        }
        Ok(())
    }
}

impl Drop for SimEcho {
    fn drop(&mut self) {
        let _ = self.unsubscribe();
        self.bus.lock().claimed.remove(&self.line);
    }
}

/// Test handle onto a simulated bus.
#[derive(Debug, Clone)]
pub struct SimMonitor {
    bus: Arc<Mutex<SimBus>>,
}

impl SimMonitor {
    /// Every level written to the trigger line, in order.
    pub fn trigger_history(&self) -> Vec<bool> {
        self.bus.lock().trigger_history.clone()
    }

    /// Current trigger level.
    pub fn trigger_level(&self) -> bool {
        self.bus.lock().trigger_level
    }

    /// True while `line` is claimed.
    pub fn is_claimed(&self, line: u32) -> bool {
        self.bus.lock().claimed.contains(&line)
    }

    /// True while an edge sink is installed.
    pub fn is_subscribed(&self) -> bool {
        self.bus.lock().sink.is_some()
    }

    /// Change the sensor response for later trigger pulses.
    pub fn set_profile(&self, profile: EchoProfile) {
        self.bus.lock().profile = profile;
    }

    /// Inject one echo edge now. `None` if nothing is subscribed.
    pub fn emit_edge(&self) -> Option<IrqReturn> {
        let sink = self.bus.lock().sink.clone()?;
        Some(sink.edge())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_are_exclusive_and_released_on_drop() {
        let mut lines = SimulatedLines::new(EchoProfile::silent());
        let monitor = lines.monitor();

        let trigger = lines.claim_trigger(4).unwrap();
        assert!(monitor.is_claimed(4));
        assert!(matches!(
            lines.claim_echo(4),
            Err(LineError::Busy { line: 4 })
        ));

        drop(trigger);
        assert!(!monitor.is_claimed(4));
        assert!(lines.claim_echo(4).is_ok());
    }

    #[test]
    fn test_unavailable_line() {
        let mut lines = SimulatedLines::new(EchoProfile::silent()).with_unavailable(17);
        assert!(matches!(
            lines.claim_echo(17),
            Err(LineError::Unavailable { line: 17 })
        ));
    }

    #[test]
    fn test_trigger_history_and_irq() {
        let mut lines = SimulatedLines::new(EchoProfile::silent());
        let monitor = lines.monitor();
        let mut trigger = lines.claim_trigger(4).unwrap();
        let echo = lines.claim_echo(17).unwrap();

        trigger.set_level(true).unwrap();
        assert!(monitor.trigger_level());
        trigger.set_level(false).unwrap();
        assert_eq!(monitor.trigger_history(), vec![true, false]);
        assert_eq!(echo.interrupt_id(), SIM_IRQ_BASE + 17);
        assert_eq!(monitor.emit_edge(), None);
    }

    #[test]
    fn test_profile_from_config() {
        let config = BackendConfig {
            echo_pulse_us: Some(1160),
            ..Default::default()
        };
        let profile = EchoProfile::from_config(&config);
        assert_eq!(profile.pulse, Some(Duration::from_micros(1160)));
        assert_eq!(
            profile.delay,
            Duration::from_micros(config.echo_delay_us)
        );
        assert_eq!(
            EchoProfile::from_config(&BackendConfig::default()).pulse,
            None
        );
    }
}
