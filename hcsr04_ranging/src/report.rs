//! Ranging results as seen by a reader.

use crate::record::{ControllerRecord, ControllerState, Timestamp};
use std::time::Duration;

/// Result code of a read.
///
/// Discriminants are the wire values of the character device result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResultCode {
    /// Both echo edges captured.
    Success = 0,
    /// Cycle outstanding.
    InProgress = 1,
    /// No echo within the timeout.
    TimedOut = 2,
    /// No cycle was started since the last reset.
    NotStarted = 3,
    /// Protocol fault.
    Unknown = 4,
}

impl ResultCode {
    /// Wire value.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::InProgress),
            2 => Some(Self::TimedOut),
            3 => Some(Self::NotStarted),
            4 => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// One read of the controller.
///
/// Timestamps are only present on `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangingReport {
    pub code: ResultCode,
    pub start_time: Option<Timestamp>,
    pub end_time: Option<Timestamp>,
    pub delta_time: Option<Duration>,
}

impl RangingReport {
    fn bare(code: ResultCode) -> Self {
        Self {
            code,
            start_time: None,
            end_time: None,
            delta_time: None,
        }
    }

    /// Report for a gate that is still BUSY.
    pub fn in_progress() -> Self {
        Self::bare(ResultCode::InProgress)
    }

    /// Report for a record whose gate is READY.
    pub fn from_record(record: &ControllerRecord) -> Self {
        match record.state {
            ControllerState::Idle => Self::bare(ResultCode::NotStarted),
            ControllerState::Completed => Self {
                code: ResultCode::Success,
                start_time: Some(record.range.start_time),
                end_time: Some(record.range.end_time),
                delta_time: Some(record.range.delta_time),
            },
            ControllerState::TimedOut => Self::bare(ResultCode::TimedOut),
            ControllerState::Invalid => Self::bare(ResultCode::Unknown),
            ControllerState::Requested
            | ControllerState::TriggerHi
            | ControllerState::TriggerLo
            | ControllerState::Triggered => Self::in_progress(),
        }
    }

    /// Echo round trip in nanoseconds, zero unless `Success`.
    pub fn delta_nanos(&self) -> u64 {
        self.delta_time
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}
