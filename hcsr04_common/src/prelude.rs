//! Prelude module for common re-exports.
//!
//! ```rust
//! use hcsr04_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::ranging::{BackendConfig, ClockSource, DeviceConfig, RangingParams};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEVICE_NAME, SPEED_OF_SOUND_DIVISOR, START_COMMAND};
