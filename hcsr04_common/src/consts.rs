//! Protocol defaults and device constants.

/// Canonical device name (used for logging and the character-device shell).
pub const DEVICE_NAME: &str = "hcsr04_driver";

/// Default trigger line (BCM numbering).
pub const DEFAULT_TRIGGER_LINE: u32 = 17;

/// Default echo line (BCM numbering).
pub const DEFAULT_ECHO_LINE: u32 = 18;

/// Default trigger pulse width in microseconds.
pub const DEFAULT_PULSE_WIDTH_US: u32 = 10;

/// Default echo timeout in microseconds (300 ms).
pub const DEFAULT_TIMEOUT_US: u32 = 300_000;

/// Upper bound for the trigger pulse width.
pub const MAX_PULSE_WIDTH_US: u32 = 1_000;

/// Upper bound for the echo timeout (10 s).
pub const MAX_TIMEOUT_US: u32 = 10_000_000;

/// Echo round-trip nanoseconds per centimetre, scaled by 100.
///
/// `distance = delta_ns * 100 / SPEED_OF_SOUND_DIVISOR` gives hundredths of a
/// centimetre.
pub const SPEED_OF_SOUND_DIVISOR: u64 = 58_140;

/// Command accepted by the character-device shell.
pub const START_COMMAND: &str = "start";

/// Size of the formatted result line buffer.
pub const RESULT_LINE_CAPACITY: usize = 100;

/// Default delay between trigger low and the simulated echo rising edge.
pub const DEFAULT_SIM_ECHO_DELAY_US: u64 = 400;
