//! HC-SR04 Common Library
//!
//! This crate provides shared constants and configuration loading utilities
//! for all HC-SR04 workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Protocol defaults and device constants
//! - [`ranging`] - Ranging device configuration (`[ranging]`, `[backend]`)
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use hcsr04_common::config::{ConfigLoader, SharedConfig};
//! use hcsr04_common::ranging::{DeviceConfig, RangingParams};
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod ranging;
