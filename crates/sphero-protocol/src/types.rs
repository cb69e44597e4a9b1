//! Shared protocol types.

use crate::constants::*;

/// Key used to match an inbound packet to a pending request or active
/// subscription: `(device_id, command_id)`.
///
/// The key deliberately excludes the sequence number, so only one request
/// per key may be in flight at a time.
pub type CorrelationKey = (u8, u8);

/// Status code carried in the first payload byte of a response packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Command succeeded.
    Success,
    /// Unknown device id.
    BadDeviceId,
    /// Unknown command id for the device.
    BadCommandId,
    /// Command recognized but not implemented.
    NotYetImplemented,
    /// Command requires elevated access.
    CommandIsRestricted,
    /// Payload length does not match the command.
    BadDataLength,
    /// Firmware failed to execute the command.
    CommandFailed,
    /// A parameter value is out of range.
    BadParameterValue,
    /// Device is busy.
    Busy,
    /// Unknown target id.
    BadTargetId,
    /// Target exists but cannot be reached.
    TargetUnavailable,
    /// Status code not in the published set.
    Unknown(u8),
}

impl ApiError {
    /// Whether this code means the command succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ApiError::Success)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Success => write!(f, "success"),
            ApiError::BadDeviceId => write!(f, "bad device id"),
            ApiError::BadCommandId => write!(f, "bad command id"),
            ApiError::NotYetImplemented => write!(f, "not yet implemented"),
            ApiError::CommandIsRestricted => write!(f, "command is restricted"),
            ApiError::BadDataLength => write!(f, "bad data length"),
            ApiError::CommandFailed => write!(f, "command failed"),
            ApiError::BadParameterValue => write!(f, "bad parameter value"),
            ApiError::Busy => write!(f, "busy"),
            ApiError::BadTargetId => write!(f, "bad target id"),
            ApiError::TargetUnavailable => write!(f, "target unavailable"),
            ApiError::Unknown(code) => write!(f, "unknown error (0x{:02X})", code),
        }
    }
}

impl From<u8> for ApiError {
    fn from(code: u8) -> Self {
        match code {
            API_ERROR_SUCCESS => ApiError::Success,
            API_ERROR_BAD_DEVICE_ID => ApiError::BadDeviceId,
            API_ERROR_BAD_COMMAND_ID => ApiError::BadCommandId,
            API_ERROR_NOT_YET_IMPLEMENTED => ApiError::NotYetImplemented,
            API_ERROR_COMMAND_IS_RESTRICTED => ApiError::CommandIsRestricted,
            API_ERROR_BAD_DATA_LENGTH => ApiError::BadDataLength,
            API_ERROR_COMMAND_FAILED => ApiError::CommandFailed,
            API_ERROR_BAD_PARAMETER_VALUE => ApiError::BadParameterValue,
            API_ERROR_BUSY => ApiError::Busy,
            API_ERROR_BAD_TARGET_ID => ApiError::BadTargetId,
            API_ERROR_TARGET_UNAVAILABLE => ApiError::TargetUnavailable,
            _ => ApiError::Unknown(code),
        }
    }
}

impl From<ApiError> for u8 {
    fn from(code: ApiError) -> Self {
        match code {
            ApiError::Success => API_ERROR_SUCCESS,
            ApiError::BadDeviceId => API_ERROR_BAD_DEVICE_ID,
            ApiError::BadCommandId => API_ERROR_BAD_COMMAND_ID,
            ApiError::NotYetImplemented => API_ERROR_NOT_YET_IMPLEMENTED,
            ApiError::CommandIsRestricted => API_ERROR_COMMAND_IS_RESTRICTED,
            ApiError::BadDataLength => API_ERROR_BAD_DATA_LENGTH,
            ApiError::CommandFailed => API_ERROR_COMMAND_FAILED,
            ApiError::BadParameterValue => API_ERROR_BAD_PARAMETER_VALUE,
            ApiError::Busy => API_ERROR_BUSY,
            ApiError::BadTargetId => API_ERROR_BAD_TARGET_ID,
            ApiError::TargetUnavailable => API_ERROR_TARGET_UNAVAILABLE,
            ApiError::Unknown(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_roundtrip() {
        for code in 0x00..=0x0A {
            let err = ApiError::from(code);
            assert_eq!(u8::from(err), code);
        }
    }

    #[test]
    fn test_api_error_unknown_fallback() {
        assert_eq!(ApiError::from(0x15), ApiError::Unknown(0x15));
        assert_eq!(u8::from(ApiError::Unknown(0xFF)), 0xFF);
    }

    #[test]
    fn test_api_error_success() {
        assert!(ApiError::Success.is_success());
        assert!(!ApiError::Busy.is_success());
    }
}
