//! Commands accepted by `write`.

use crate::error::DeviceError;
use hcsr04_common::consts::START_COMMAND;

/// A parsed device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin a ranging cycle.
    Start,
}

/// Parse the first word of a write buffer.
///
/// Leading whitespace is skipped and the word is matched case-insensitively.
/// It must be followed by the end of the buffer, whitespace or a NUL; anything
/// after that is ignored.
pub fn parse_command(buf: &[u8]) -> Result<Command, DeviceError> {
    let rest = match buf.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(first) => &buf[first..],
        None => return Err(DeviceError::InvalidCommand),
    };

    let word = START_COMMAND.as_bytes();
    if rest.len() < word.len() || !rest[..word.len()].eq_ignore_ascii_case(word) {
        return Err(DeviceError::InvalidCommand);
    }

    match rest.get(word.len()) {
        None | Some(0) => Ok(Command::Start),
        Some(b) if b.is_ascii_whitespace() => Ok(Command::Start),
        Some(_) => Err(DeviceError::InvalidCommand),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_start_variants() {
        for buf in [
            &b"start"[..],
            b"start\n",
            b"  \tSTART\n",
            b"Start now",
            b"start\0garbage",
        ] {
            assert_eq!(parse_command(buf).unwrap(), Command::Start, "{buf:?}");
        }
    }

    #[test]
    fn test_rejects_other_input() {
        for buf in [&b""[..], b"   ", b"stop", b"star", b"startx", b"s t a r t"] {
            assert!(
                matches!(parse_command(buf), Err(DeviceError::InvalidCommand)),
                "{buf:?}"
            );
        }
    }
}
