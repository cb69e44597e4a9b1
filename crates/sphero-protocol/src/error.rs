//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or reassembling frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame does not begin with the start marker.
    #[error("bad start of packet: 0x{0:02X}")]
    BadStartByte(u8),

    /// Frame does not end with the end marker.
    #[error("bad end of packet: 0x{0:02X}")]
    BadEndByte(u8),

    /// An escape byte was followed by a value that is not an escaped
    /// reserved byte.
    #[error("bad escape sequence: 0x{0:02X}")]
    BadEscapeByte(u8),

    /// Frame is too short to hold the mandatory fields.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Encoded frame exceeds the transport write limit.
    #[error("frame too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual encoded length.
        actual: usize,
    },

    /// Computed checksum disagrees with the checksum byte on the wire.
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch {
        /// Checksum byte received on the wire.
        expected: u8,
        /// Checksum computed over the decoded field span.
        actual: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::BadEscapeByte(0x42);
        assert!(err.to_string().contains("0x42"));

        let err = ProtocolError::ChecksumMismatch {
            expected: 0x64,
            actual: 0x65,
        };
        assert!(err.to_string().contains("0x64"));
        assert!(err.to_string().contains("0x65"));
    }
}
