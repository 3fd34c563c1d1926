//! Character-device style file interface.
//!
//! [`CharDevice`] stands for the device node: it holds the configuration and
//! the line backend, and lets one handle be open at a time. Each
//! [`DeviceFile`] owns a freshly initialised ranging device for its lifetime.

use crate::command::{Command, parse_command};
use crate::error::DeviceError;
use crate::format::format_result;
use hcsr04_common::ranging::DeviceConfig;
use hcsr04_ranging::backend_registry::BackendRegistry;
use hcsr04_ranging::lines::LineProvider;
use hcsr04_ranging::{Clock, DeviceSlot, RangingDevice, RangingError, ResultCode, SystemClock};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

/// Released when the owning handle is dropped.
#[derive(Debug)]
struct InstanceToken {
    open: Arc<AtomicBool>,
}

impl InstanceToken {
    fn acquire(open: &Arc<AtomicBool>) -> Option<Self> {
        open.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                open: Arc::clone(open),
            })
    }
}

impl Drop for InstanceToken {
    fn drop(&mut self) {
        self.open.store(false, Ordering::Release);
    }
}

/// The device node.
pub struct CharDevice {
    config: DeviceConfig,
    lines: Mutex<Box<dyn LineProvider>>,
    clock: Arc<dyn Clock>,
    open: Arc<AtomicBool>,
}

impl CharDevice {
    /// Device over an explicit backend and clock.
    pub fn new(config: DeviceConfig, lines: Box<dyn LineProvider>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            lines: Mutex::new(lines),
            clock,
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Device over the backend named in `config`, timestamped by the configured clock.
    pub fn from_config(
        config: DeviceConfig,
        registry: &BackendRegistry,
    ) -> Result<Self, DeviceError> {
        let lines = registry
            .create(&config.backend)
            .map_err(RangingError::from)?;
        let clock = Arc::new(SystemClock::new(config.ranging.clock));
        info!(
            "Device {} using '{}' backend",
            config.shared.service_name,
            lines.name()
        );
        Ok(Self::new(config, lines, clock))
    }

    /// Loaded configuration.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// True while a handle is open.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Open the device and initialise a ranging controller for the handle.
    ///
    /// # Errors
    ///
    /// `Busy` while another handle is open, or the init failure.
    pub fn open(&self) -> Result<DeviceFile, DeviceError> {
        let Some(token) = InstanceToken::acquire(&self.open) else {
            warn!("{}: device is currently in use", self.config.shared.service_name);
            return Err(DeviceError::Busy);
        };

        let mut slot = DeviceSlot::new();
        {
            let mut lines = self.lines.lock();
            slot.init(&self.config.ranging, &mut **lines, Arc::clone(&self.clock))?;
        }
        info!("{}: open success", self.config.shared.service_name);
        Ok(DeviceFile {
            slot,
            _token: token,
        })
    }
}

/// An open handle.
///
/// Dropping it releases the ranging device and then the instance token.
pub struct DeviceFile {
    slot: DeviceSlot,
    _token: InstanceToken,
}

impl DeviceFile {
    /// Handle a write. Returns the number of bytes consumed (all of them).
    ///
    /// # Errors
    ///
    /// `InvalidCommand` unless the buffer starts with `start`; controller
    /// rejections as `Ranging`.
    pub fn write(&self, buf: &[u8]) -> Result<usize, DeviceError> {
        match parse_command(buf)? {
            Command::Start => self.slot.start()?,
        }
        Ok(buf.len())
    }

    /// Handle a read.
    ///
    /// Returns 0 if no cycle was started. Otherwise acknowledges the result
    /// and copies one result line into `buf`, returning its length. A cycle
    /// still in progress is reported as a `Ranging` conflict.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, DeviceError> {
        let report = self.slot.read_result()?;
        if report.code == ResultCode::NotStarted {
            return Ok(0);
        }

        let line = format_result(&report);
        if buf.len() < line.len() {
            warn!("Read buffer is insufficient: {} < {}", buf.len(), line.len());
            return Err(DeviceError::BufferTooSmall {
                needed: line.len(),
                available: buf.len(),
            });
        }

        self.slot.reset()?;
        buf[..line.len()].copy_from_slice(line.as_bytes());
        debug!("Result line: {}", line.trim_end());
        Ok(line.len())
    }

    /// Ranging device behind this handle.
    pub fn device(&self) -> Result<&RangingDevice, DeviceError> {
        Ok(self.slot.get()?)
    }

    /// Close the handle.
    pub fn release(mut self) {
        self.slot.release();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
