//! Top-level toy handle.

use std::sync::Arc;

use crate::device::{
    Animatronics, ApiProcessor, Driving, Power, Sensor, SystemInfo, UserIo,
};
use crate::session::SpheroSession;
use crate::transport::Transport;

/// High-level handle for one connected toy.
///
/// Owns the session and exposes a facade per subsystem. The transport is
/// injected, so BLE backends (and test doubles) are interchangeable.
pub struct Sphero {
    session: Arc<SpheroSession>,
}

impl Sphero {
    /// Start a session over a connected transport.
    pub fn connect(transport: Arc<dyn Transport>) -> Self {
        Sphero {
            session: SpheroSession::start(transport),
        }
    }

    /// The underlying session, for custom commands and timeouts.
    pub fn session(&self) -> &Arc<SpheroSession> {
        &self.session
    }

    /// API processor commands (ping).
    pub fn api_processor(&self) -> ApiProcessor {
        ApiProcessor::new(self.session.clone())
    }

    /// System information commands.
    pub fn system_info(&self) -> SystemInfo {
        SystemInfo::new(self.session.clone())
    }

    /// Power and battery commands.
    pub fn power(&self) -> Power {
        Power::new(self.session.clone())
    }

    /// Driving commands.
    pub fn driving(&self) -> Driving {
        Driving::new(self.session.clone())
    }

    /// Animatronics commands.
    pub fn animatronics(&self) -> Animatronics {
        Animatronics::new(self.session.clone())
    }

    /// Sensor commands and streaming.
    pub fn sensor(&self) -> Sensor {
        Sensor::new(self.session.clone())
    }

    /// LED and audio commands.
    pub fn user_io(&self) -> UserIo {
        UserIo::new(self.session.clone())
    }

    /// Shut the session down and close the transport.
    pub fn close(&self) {
        self.session.close();
    }
}
