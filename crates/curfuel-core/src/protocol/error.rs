//! Protocol errors

use thiserror::Error;

/// Errors from the serial channel
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The device could not be opened right now (missing, busy, unplugged)
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    /// The port settings can never work, retrying is pointless
    #[error("Invalid port settings: {0}")]
    InvalidSettings(String),

    #[error("Failed to open {device} after {attempts} attempt(s): {reason}")]
    OpenFailed {
        device: String,
        attempts: u32,
        reason: String,
    },

    #[error("Not connected to device")]
    NotConnected,

    #[error("Lost device: {0}")]
    Disconnected(#[from] std::io::Error),

    #[error("Interrupted by shutdown request")]
    Interrupted,
}

impl ChannelError {
    /// Whether another open attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChannelError::Unavailable(_) | ChannelError::Disconnected(_)
        )
    }
}

/// Errors decoding a single protocol line
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Malformed line: expected 3 fields, got {fields}")]
    MalformedLine { fields: usize },

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Invalid value '{0}'")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ChannelError::Unavailable("busy".into()).is_retryable());
        assert!(!ChannelError::InvalidSettings("baud".into()).is_retryable());
        assert!(!ChannelError::Interrupted.is_retryable());
        assert!(!ChannelError::OpenFailed {
            device: "/dev/ttyACM0".into(),
            attempts: 3,
            reason: "gone".into(),
        }
        .is_retryable());
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::MalformedLine { fields: 2 };
        assert_eq!(err.to_string(), "Malformed line: expected 3 fields, got 2");
    }
}
