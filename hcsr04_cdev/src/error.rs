//! Errors of the file interface and their errno values.

use hcsr04_ranging::RangingError;
use nix::errno::Errno;
use thiserror::Error;

/// Errors returned by `open`, `read` and `write`.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Another handle holds the device open.
    #[error("Device is currently in use")]
    Busy,

    /// The written buffer is not a `start` command.
    #[error("Invalid device command")]
    InvalidCommand,

    /// The read buffer cannot hold the result line.
    #[error("Read buffer too small: need {needed} bytes, got {available}")]
    BufferTooSmall {
        /// Length of the result line
        needed: usize,
        /// Length of the caller's buffer
        available: usize,
    },

    /// The controller rejected the operation.
    #[error("Ranging error: {0}")]
    Ranging(#[from] RangingError),
}

impl DeviceError {
    /// errno a character device would return for this error.
    pub fn errno(&self) -> Errno {
        match self {
            DeviceError::Busy => Errno::EBUSY,
            DeviceError::InvalidCommand => Errno::EINVAL,
            DeviceError::BufferTooSmall { .. } => Errno::ENOBUFS,
            DeviceError::Ranging(e) => match e {
                RangingError::Conflict { .. } => Errno::EAGAIN,
                RangingError::BadState { .. } | RangingError::NotInitialized => Errno::EBADFD,
                RangingError::AlreadyInitialized => Errno::EBUSY,
                RangingError::Line(_) | RangingError::Spawn(_) => Errno::EIO,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcsr04_ranging::{ControllerState, LineError};

    #[test]
    fn test_errno_mapping() {
        assert_eq!(DeviceError::Busy.errno(), Errno::EBUSY);
        assert_eq!(DeviceError::InvalidCommand.errno(), Errno::EINVAL);
        assert_eq!(
            DeviceError::BufferTooSmall {
                needed: 40,
                available: 8
            }
            .errno(),
            Errno::ENOBUFS
        );
        let conflict: DeviceError = RangingError::Conflict {
            state: ControllerState::Triggered,
        }
        .into();
        assert_eq!(conflict.errno(), Errno::EAGAIN);
        let bad_state: DeviceError = RangingError::BadState {
            state: ControllerState::Completed,
        }
        .into();
        assert_eq!(bad_state.errno(), Errno::EBADFD);
        let line: DeviceError = RangingError::from(LineError::Busy { line: 17 }).into();
        assert_eq!(line.errno(), Errno::EIO);
    }
}
