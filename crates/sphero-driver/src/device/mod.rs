//! Per-device command facades.
//!
//! Each subsystem of the toy is addressed by a fixed device id; a facade
//! is a thin builder that assembles a packet from semantic parameters and
//! hands it to the session. All protocol mechanics (framing, sequencing,
//! correlation, timeouts) live below this layer.

mod animatronics;
mod api_processor;
mod driving;
mod power;
mod sensor;
mod system_info;
mod user_io;

pub use animatronics::*;
pub use api_processor::*;
pub use driving::*;
pub use power::*;
pub use sensor::*;
pub use system_info::*;
pub use user_io::*;

use sphero_protocol::Packet;

use crate::error::{Error, Result};

/// Device (subsystem) ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceId {
    /// API processor (echo/ping).
    ApiProcessor = 0x10,
    /// System information (versions, MAC address).
    SystemInfo = 0x11,
    /// Power management and battery.
    Power = 0x13,
    /// Driving and motors.
    Driving = 0x16,
    /// Animations and articulated parts.
    Animatronics = 0x17,
    /// Sensor telemetry.
    Sensors = 0x18,
    /// LEDs, audio, and other user I/O.
    UserIo = 0x1A,
}

/// Routing target for commands handled by the main processor.
pub(crate) const TARGET_MAIN_PROCESSOR: u8 = 0x12;
/// Routing target for commands handled by the nordic co-processor.
pub(crate) const TARGET_NORDIC_PROCESSOR: u8 = 0x11;

/// Unwrap the response of a command whose flags always request one.
pub(crate) fn expect_response(response: Option<Packet>) -> Result<Packet> {
    response.ok_or(Error::NoResponse)
}
