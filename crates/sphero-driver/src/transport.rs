//! Transport boundary.
//!
//! The session drives a toy through this trait and nothing else; the BLE
//! stack (connection establishment, characteristic discovery, GATT I/O)
//! lives entirely on the other side of it. Different backends are plain
//! trait implementations chosen by dependency injection, and tests use an
//! in-memory channel-backed implementation.
//!
//! A real BLE backend writes frames to the API v2 characteristic
//! ([`sphero_protocol::API_V2_CHARACTERISTIC`]) and feeds notification
//! chunks back out of `recv`. Chunk boundaries carry no alignment
//! guarantee with frame boundaries; reassembly is the session's job.

use std::time::Duration;

use thiserror::Error;

/// Errors reported by a transport backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection establishment failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// A frame could not be written.
    #[error("write failed: {0}")]
    Write(String),

    /// Receiving inbound data failed.
    #[error("receive failed: {0}")]
    Receive(String),

    /// The transport is no longer usable.
    #[error("transport is closed")]
    Closed,
}

/// Byte-level I/O with one connected toy.
pub trait Transport: Send + Sync + 'static {
    /// Send one complete encoded frame.
    fn write(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Wait up to `wait` for the next raw inbound chunk.
    ///
    /// Returns `Ok(None)` when the wait expires with nothing received;
    /// the session's receiver thread calls this in a loop.
    fn recv(&self, wait: Duration) -> Result<Option<Vec<u8>>, TransportError>;

    /// Tear the connection down. Best-effort: errors are swallowed.
    fn close(&self);
}
