//! Driver error types.

use sphero_protocol::{ApiError, ProtocolError};
use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced to callers of the session and device APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed wire data.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The toy answered with a non-success status code.
    #[error("api response error: {0}")]
    Api(ApiError),

    /// No matching response arrived in time. Does not imply the
    /// connection is gone.
    #[error("timed out waiting for response to device 0x{device_id:02X} command 0x{command_id:02X}")]
    Timeout {
        /// Device id of the pending request.
        device_id: u8,
        /// Command id of the pending request.
        command_id: u8,
    },

    /// A command that does not request a response was asked for one.
    #[error("command did not request a response")]
    NoResponse,

    /// A subscription is already active for this correlation key.
    #[error("subscription already active for device 0x{device_id:02X} command 0x{command_id:02X}")]
    DuplicateSubscription {
        /// Device id of the active subscription.
        device_id: u8,
        /// Command id of the active subscription.
        command_id: u8,
    },

    /// No subscription is active for this correlation key.
    #[error("no active subscription for device 0x{device_id:02X} command 0x{command_id:02X}")]
    SubscriptionNotFound {
        /// Device id looked up.
        device_id: u8,
        /// Command id looked up.
        command_id: u8,
    },

    /// The session has been closed.
    #[error("session is closed")]
    Closed,

    /// A response arrived but its payload does not have the expected
    /// shape.
    #[error("malformed response payload: {0}")]
    BadResponse(String),
}

/// Shorthand for driver results.
pub type Result<T> = std::result::Result<T, Error>;
