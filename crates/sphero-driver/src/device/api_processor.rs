//! API processor commands.

use std::sync::Arc;

use sphero_protocol::Packet;

use crate::device::DeviceId;
use crate::error::Result;
use crate::session::SpheroSession;

/// Command ids for the API processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApiProcessorCommand {
    /// Ping the toy.
    Echo = 0x00,
}

/// Facade for the API processor subsystem.
pub struct ApiProcessor {
    session: Arc<SpheroSession>,
}

impl ApiProcessor {
    /// Create the facade over a session.
    pub fn new(session: Arc<SpheroSession>) -> Self {
        ApiProcessor { session }
    }

    /// Send a ping and wait for its acknowledgement.
    pub fn echo(&self) -> Result<()> {
        self.session.request(Packet::command(
            DeviceId::ApiProcessor as u8,
            ApiProcessorCommand::Echo as u8,
        ))?;
        Ok(())
    }
}
