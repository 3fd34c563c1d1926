//! # HC-SR04 Character Device
//!
//! File-style front end for the ranging controller: `open` claims the single
//! instance and initialises the controller, `write("start")` begins a cycle,
//! `read` returns one result line and acknowledges it.
//!
//! # Module Structure
//!
//! - [`device`] - `CharDevice` and open `DeviceFile` handles
//! - [`command`] - `write` command parsing
//! - [`format`] - result line formatting and parsing
//! - [`error`] - `DeviceError` and its errno values

pub mod command;
pub mod device;
pub mod error;
pub mod format;

pub use crate::device::{CharDevice, DeviceFile};
pub use crate::error::DeviceError;
pub use crate::format::{ResultLine, format_result};
