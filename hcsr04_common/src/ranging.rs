//! Ranging device configuration types.
//!
//! - `RangingParams` - line numbers and protocol timing (`[ranging]`)
//! - `BackendConfig` - line backend selection (`[backend]`)
//! - `DeviceConfig` - the whole `hcsr04.toml`

use crate::config::{ConfigError, SharedConfig};
use crate::consts::{
    DEFAULT_ECHO_LINE, DEFAULT_PULSE_WIDTH_US, DEFAULT_SIM_ECHO_DELAY_US, DEFAULT_TIMEOUT_US,
    DEFAULT_TRIGGER_LINE, MAX_PULSE_WIDTH_US, MAX_TIMEOUT_US,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_trigger_line() -> u32 {
    DEFAULT_TRIGGER_LINE
}

fn default_echo_line() -> u32 {
    DEFAULT_ECHO_LINE
}

fn default_pulse_width_us() -> u32 {
    DEFAULT_PULSE_WIDTH_US
}

fn default_timeout_us() -> u32 {
    DEFAULT_TIMEOUT_US
}

fn default_true() -> bool {
    true
}

fn default_backend_name() -> String {
    "simulation".to_string()
}

fn default_echo_delay_us() -> u64 {
    DEFAULT_SIM_ECHO_DELAY_US
}

/// Clock used to timestamp echo edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    /// Wall clock (`CLOCK_REALTIME`).
    #[default]
    Realtime,
    /// Monotonic clock, immune to wall clock steps.
    Monotonic,
}

/// Line numbers and timing for one ranging device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangingParams {
    /// Output line wired to the sensor TRIG pin.
    #[serde(default = "default_trigger_line")]
    pub trigger_line: u32,

    /// Input line wired to the sensor ECHO pin.
    #[serde(default = "default_echo_line")]
    pub echo_line: u32,

    /// Width of the trigger pulse in microseconds.
    #[serde(default = "default_pulse_width_us")]
    pub pulse_width_us: u32,

    /// How long to wait for the echo after the trigger pulse, in microseconds.
    #[serde(default = "default_timeout_us")]
    pub timeout_us: u32,

    /// Whether `read_result` waits for the cycle to finish.
    #[serde(default = "default_true")]
    pub blocking: bool,

    /// Timestamp source for echo edges.
    #[serde(default)]
    pub clock: ClockSource,
}

impl Default for RangingParams {
    fn default() -> Self {
        Self {
            trigger_line: DEFAULT_TRIGGER_LINE,
            echo_line: DEFAULT_ECHO_LINE,
            pulse_width_us: DEFAULT_PULSE_WIDTH_US,
            timeout_us: DEFAULT_TIMEOUT_US,
            blocking: true,
            clock: ClockSource::default(),
        }
    }
}

impl RangingParams {
    /// Trigger pulse width as a `Duration`.
    pub fn pulse_width(&self) -> Duration {
        Duration::from_micros(u64::from(self.pulse_width_us))
    }

    /// Echo timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_micros(u64::from(self.timeout_us))
    }

    /// Validate line numbers and timing bounds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - trigger and echo share a line
    /// - `pulse_width_us` is outside `1..=MAX_PULSE_WIDTH_US`
    /// - `timeout_us` is outside `1..=MAX_TIMEOUT_US`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trigger_line == self.echo_line {
            return Err(ConfigError::ValidationError(format!(
                "trigger_line and echo_line must differ (both {})",
                self.trigger_line
            )));
        }
        if !(1..=MAX_PULSE_WIDTH_US).contains(&self.pulse_width_us) {
            return Err(ConfigError::ValidationError(format!(
                "pulse_width_us {} out of range 1..={}",
                self.pulse_width_us, MAX_PULSE_WIDTH_US
            )));
        }
        if !(1..=MAX_TIMEOUT_US).contains(&self.timeout_us) {
            return Err(ConfigError::ValidationError(format!(
                "timeout_us {} out of range 1..={}",
                self.timeout_us, MAX_TIMEOUT_US
            )));
        }
        Ok(())
    }
}

/// Line backend selection.
///
/// The `echo_*` keys only apply to the `simulation` backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Registered backend name ("simulation", "rppal").
    #[serde(default = "default_backend_name")]
    pub name: String,

    /// Delay between trigger low and the simulated echo rising edge.
    #[serde(default = "default_echo_delay_us")]
    pub echo_delay_us: u64,

    /// Width of the simulated echo pulse. `None` simulates "no echo".
    #[serde(default)]
    pub echo_pulse_us: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: default_backend_name(),
            echo_delay_us: DEFAULT_SIM_ECHO_DELAY_US,
            echo_pulse_us: None,
        }
    }
}

/// Complete device configuration loaded from `hcsr04.toml`.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "hcsr04"
///
/// [ranging]
/// trigger_line = 4
/// echo_line = 17
/// timeout_us = 300000
///
/// [backend]
/// name = "simulation"
/// echo_pulse_us = 1160
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Common application settings.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Ranging line and timing parameters.
    #[serde(default)]
    pub ranging: RangingParams,

    /// Line backend.
    #[serde(default)]
    pub backend: BackendConfig,
}

impl DeviceConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.ranging.validate()?;
        if self.backend.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "backend.name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
