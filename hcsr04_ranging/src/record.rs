//! The controller record shared by the edge, controller and phase contexts.
//!
//! One record exists per device instance. It is only ever reached through the
//! lock owned by [`RangingCore`](crate::core::RangingCore); the handlers take
//! `&mut ControllerRecord` for the duration of one critical section.

use bitflags::bitflags;
use std::time::Duration;

/// Controller states, in the only legal forward order.
///
/// `Idle → Requested → TriggerHi → TriggerLo → Triggered → {Completed | TimedOut | Invalid}`
///
/// The only way back is a reset to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ControllerState {
    /// No cycle outstanding.
    #[default]
    Idle,
    /// A cycle was requested by `start`.
    Requested,
    /// About to drive the trigger line high.
    TriggerHi,
    /// About to drive the trigger line low.
    TriggerLo,
    /// Trigger pulse sent; waiting for echo edges or the timeout.
    Triggered,
    /// Both echo edges captured before the timeout.
    Completed,
    /// The timeout fired before the rising edge.
    TimedOut,
    /// Protocol fault: expected evidence was missing at a transition.
    Invalid,
}

impl ControllerState {
    /// `Completed`, `TimedOut` or `Invalid`.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ControllerState::Completed | ControllerState::TimedOut | ControllerState::Invalid
        )
    }

    /// A cycle is outstanding (`Requested` through `Triggered`).
    #[inline]
    pub const fn is_in_flight(self) -> bool {
        matches!(
            self,
            ControllerState::Requested
                | ControllerState::TriggerHi
                | ControllerState::TriggerLo
                | ControllerState::Triggered
        )
    }
}

bitflags! {
    /// Evidence collected during one cycle.
    ///
    /// Flags are set-once: nothing clears them before the next `Requested` step.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Evidence: u8 {
        /// Trigger line confirmed high.
        const TRIGGER_HI = 0x01;
        /// Trigger line confirmed low.
        const TRIGGER_LO = 0x02;
        /// Timeout fired with no rising edge seen.
        const TIMEOUT    = 0x04;
        /// Echo rising edge captured.
        const ECHO_RISE  = 0x08;
        /// Echo falling edge captured.
        const ECHO_FALL  = 0x10;
    }
}

/// A point in time as seconds + nanoseconds since the clock's epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// The epoch itself (also the zeroed value of an empty range).
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Build from seconds and nanoseconds.
    pub const fn new(secs: u64, nanos: u32) -> Self {
        Self(Duration::new(secs, nanos))
    }

    /// Build from an offset since the epoch.
    pub const fn from_duration(since_epoch: Duration) -> Self {
        Self(since_epoch)
    }

    /// Offset since the epoch.
    pub const fn as_duration(self) -> Duration {
        self.0
    }

    /// Whole seconds.
    pub const fn secs(self) -> u64 {
        self.0.as_secs()
    }

    /// Nanoseconds past the whole second.
    pub const fn subsec_nanos(self) -> u32 {
        self.0.subsec_nanos()
    }

    /// `self - earlier`, or zero if the clock went backwards.
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// Timestamp `delay` after this one.
    pub fn saturating_add(self, delay: Duration) -> Timestamp {
        Self(self.0.saturating_add(delay))
    }
}

/// Echo edge timestamps and their difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeData {
    /// Echo rising edge.
    pub start_time: Timestamp,
    /// Echo falling edge.
    pub end_time: Timestamp,
    /// `end_time - start_time`, computed on completion.
    pub delta_time: Duration,
}

/// Line configuration, immutable after init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    /// Trigger output line.
    pub trigger_line: u32,
    /// Echo input line.
    pub echo_line: u32,
    /// Interrupt id of the echo line edge subscription.
    pub echo_irq: u32,
    /// Trigger pulse width in microseconds.
    pub pulse_width_us: u32,
    /// Echo timeout in microseconds.
    pub timeout_us: u32,
}

impl LineConfig {
    /// Trigger pulse width as a `Duration`.
    pub fn pulse_width(&self) -> Duration {
        Duration::from_micros(u64::from(self.pulse_width_us))
    }

    /// Echo timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_micros(u64::from(self.timeout_us))
    }
}

/// Mutable controller state guarded by the core's lock.
#[derive(Debug, Clone)]
pub struct ControllerRecord {
    /// Current controller state.
    pub state: ControllerState,
    /// Evidence collected in the current cycle.
    pub evidence: Evidence,
    /// Echo timestamps of the current cycle.
    pub range: RangeData,
    /// Line configuration.
    pub gpio: LineConfig,
}

impl ControllerRecord {
    /// Zero-initialised record for the given lines.
    pub fn new(gpio: LineConfig) -> Self {
        Self {
            state: ControllerState::Idle,
            evidence: Evidence::empty(),
            range: RangeData::default(),
            gpio,
        }
    }

    /// Forget everything collected by the previous cycle.
    pub fn clear_cycle(&mut self) {
        self.evidence = Evidence::empty();
        self.range = RangeData::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_classification() {
        use ControllerState::*;
        for state in [Completed, TimedOut, Invalid] {
            assert!(state.is_terminal());
            assert!(!state.is_in_flight());
        }
        for state in [Requested, TriggerHi, TriggerLo, Triggered] {
            assert!(state.is_in_flight());
            assert!(!state.is_terminal());
        }
        assert!(!Idle.is_terminal());
        assert!(!Idle.is_in_flight());
    }

    #[test]
    fn timestamp_difference_saturates() {
        let early = Timestamp::new(10, 999_999_500);
        let late = Timestamp::new(11, 660);
        assert_eq!(late.saturating_since(early), Duration::from_nanos(1160));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
        assert_eq!(late.secs(), 11);
        assert_eq!(late.subsec_nanos(), 660);
    }

    #[test]
    fn clear_cycle_keeps_state_and_lines() {
        let gpio = LineConfig {
            trigger_line: 4,
            echo_line: 17,
            echo_irq: 17,
            pulse_width_us: 10,
            timeout_us: 300_000,
        };
        let mut record = ControllerRecord::new(gpio);
        record.state = ControllerState::Completed;
        record.evidence = Evidence::ECHO_RISE | Evidence::ECHO_FALL;
        record.range.delta_time = Duration::from_micros(580);

        record.clear_cycle();
        assert_eq!(record.state, ControllerState::Completed);
        assert!(record.evidence.is_empty());
        assert_eq!(record.range, RangeData::default());
        assert_eq!(record.gpio, gpio);
        assert_eq!(gpio.timeout(), Duration::from_millis(300));
    }
}
