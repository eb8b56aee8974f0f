//! # Error Types
//!
//! Custom error types for CRSF Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for CRSF Bridge
#[derive(Debug, Error)]
pub enum CrsfBridgeError {
    /// Checksum mismatch or invalid declared length
    #[error("CRSF framing error: {0}")]
    Framing(String),

    /// Structurally valid frame with no semantic handler
    #[error("Unsupported CRSF frame type: 0x{0:02X}")]
    UnsupportedFrameType(u8),

    /// Transport was never opened or has been excluded
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Caller supplied a payload that does not match the frame type
    #[error("Invalid payload size for frame type 0x{frame_type:02X}: expected {expected}, got {actual}")]
    InvalidPayloadSize {
        frame_type: u8,
        expected: usize,
        actual: usize,
    },

    /// Channel index outside 1..=16
    #[error("Channel {0} is out of range (must be 1-16)")]
    ChannelOutOfRange(usize),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Input device errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No usable input device was found
    #[error("No joystick found")]
    ControllerNotFound,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CRSF Bridge
pub type Result<T> = std::result::Result<T, CrsfBridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_payload_size_message() {
        let err = CrsfBridgeError::InvalidPayloadSize {
            frame_type: 0x16,
            expected: 22,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid payload size for frame type 0x16: expected 22, got 3"
        );
    }

    #[test]
    fn test_unsupported_frame_type_message() {
        let err = CrsfBridgeError::UnsupportedFrameType(0x7A);
        assert_eq!(err.to_string(), "Unsupported CRSF frame type: 0x7A");
    }
}
