//! Error types for line collaborators and the ranging controller API.

use crate::record::ControllerState;
use thiserror::Error;

/// Errors reported by line backends (claim, drive, subscribe).
#[derive(Debug, Clone, Error)]
pub enum LineError {
    /// The line does not exist or cannot be used by this backend.
    #[error("Line {line} unavailable")]
    Unavailable {
        /// Line number
        line: u32,
    },

    /// The line is already claimed by another user.
    #[error("Line {line} already claimed")]
    Busy {
        /// Line number
        line: u32,
    },

    /// Edge subscription already installed on this line.
    #[error("Edge subscription already installed on line {line}")]
    AlreadySubscribed {
        /// Line number
        line: u32,
    },

    /// No backend registered under this name.
    #[error("Line backend not found: {0}")]
    UnknownBackend(String),

    /// GPIO driver error reported by the platform.
    #[error("GPIO error: {0}")]
    Gpio(String),
}

/// Errors returned by the ranging controller API.
#[derive(Debug, Error)]
pub enum RangingError {
    /// `init` called on a slot that already holds a device.
    #[error("Device already initialized")]
    AlreadyInitialized,

    /// Operation on a slot without a device.
    #[error("Device not initialized")]
    NotInitialized,

    /// A cycle is outstanding; the request was rejected without side effects.
    #[error("Ranging cycle in progress (state {state:?})")]
    Conflict {
        /// Controller state observed when rejecting
        state: ControllerState,
    },

    /// A result was never acknowledged; `reset` is required first.
    #[error("Unacknowledged result in state {state:?}, reset required")]
    BadState {
        /// Controller state observed when rejecting
        state: ControllerState,
    },

    /// Line acquisition or subscription failed.
    #[error("Line error: {0}")]
    Line(#[from] LineError),

    /// An execution context thread could not be spawned.
    #[error("Failed to spawn execution context: {0}")]
    Spawn(#[from] std::io::Error),
}

impl RangingError {
    /// True for rejections that leave the controller untouched and may succeed later.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RangingError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_error_display() {
        let err = LineError::Busy { line: 17 };
        assert!(err.to_string().contains("17"));

        let err = LineError::UnknownBackend("ethercat".to_string());
        assert!(err.to_string().contains("ethercat"));
    }

    #[test]
    fn test_line_error_converts() {
        let err: RangingError = LineError::Unavailable { line: 4 }.into();
        assert!(matches!(err, RangingError::Line(LineError::Unavailable { line: 4 })));
        assert!(!err.is_conflict());
    }
}
