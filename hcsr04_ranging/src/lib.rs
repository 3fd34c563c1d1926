//! # HC-SR04 Ranging Controller
//!
//! Asynchronous trigger/echo ranging for the HC-SR04 ultrasonic sensor.
//!
//! One ranging cycle is driven by three execution contexts sharing a single
//! lock-guarded controller record:
//!
//! - the edge context capturing echo timestamps ([`edge`]),
//! - the controller context running the state machine ([`machine`]),
//! - the phase context driving the trigger line and detecting the timeout
//!   ([`phase`]).
//!
//! A readiness gate ([`gate`]) lets readers wait for the cycle to finish.
//!
//! # Module Structure
//!
//! - [`core`] - `RangingCore`, the handlers entered from each context
//! - [`contexts`] - worker threads and their `Dispatcher`
//! - [`stepper`] - deterministic single-threaded executor with virtual time
//! - [`device`] - `RangingDevice` and `DeviceSlot` lifecycle
//! - [`lines`] - trigger/echo line traits and backends
//! - [`backend_registry`] - backend factories by name
//!
//! # Architecture
//!
//! ```text
//!   start() ──► Controller ──arm(delay)──► Phase timer ──► trigger line
//!                  ▲   ▲                       │
//!                  │   └──── schedule ─────────┘
//!                  │
//!   echo line ──► Edge capture ── schedule
//! ```

pub mod backend_registry;
pub mod clock;
pub mod contexts;
pub mod core;
pub mod device;
pub mod dispatch;
pub mod edge;
pub mod error;
pub mod gate;
pub mod lines;
pub mod machine;
pub mod phase;
pub mod record;
pub mod report;
pub mod stepper;

// Re-export key types for convenience
pub use crate::backend_registry::BackendRegistry;
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::RangingCore;
pub use crate::device::{DeviceSlot, RangingDevice};
pub use crate::dispatch::Dispatcher;
pub use crate::edge::IrqReturn;
pub use crate::error::{LineError, RangingError};
pub use crate::gate::Readiness;
pub use crate::record::{ControllerState, Evidence, LineConfig, Timestamp};
pub use crate::report::{RangingReport, ResultCode};
pub use crate::stepper::Stepper;
