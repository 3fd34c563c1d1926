//! Timestamp sources for echo edges.

use crate::record::Timestamp;
use hcsr04_common::ranging::ClockSource;
use nix::time::{ClockId, clock_gettime};
use parking_lot::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Source of edge timestamps. Must be callable from the edge context.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Host clock read through `clock_gettime`.
#[derive(Debug)]
pub struct SystemClock {
    source: ClockSource,
    origin: Instant,
}

impl SystemClock {
    pub fn new(source: ClockSource) -> Self {
        Self {
            source,
            origin: Instant::now(),
        }
    }

    /// Clock ID queried for `source`.
    pub fn clock_id(&self) -> ClockId {
        match self.source {
            ClockSource::Realtime => ClockId::CLOCK_REALTIME,
            ClockSource::Monotonic => ClockId::CLOCK_MONOTONIC,
        }
    }

    fn fallback(&self) -> Timestamp {
        let since_epoch = match self.source {
            ClockSource::Realtime => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default(),
            ClockSource::Monotonic => self.origin.elapsed(),
        };
        Timestamp::from_duration(since_epoch)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(ClockSource::default())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        match clock_gettime(self.clock_id()) {
            Ok(ts) => {
                let secs = u64::try_from(ts.tv_sec()).unwrap_or(0);
                let nanos = u32::try_from(ts.tv_nsec()).unwrap_or(0);
                Timestamp::new(secs, nanos)
            }
            Err(e) => {
                warn!("clock_gettime({:?}) failed: {}", self.source, e);
                self.fallback()
            }
        }
    }
}

/// Virtual clock advanced by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to `at`. Time never moves backwards.
    pub fn set(&self, at: Timestamp) {
        let mut now = self.now.lock();
        if at > *now {
            *now = at;
        }
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = now.saturating_add(by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
