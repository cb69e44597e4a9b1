//! System information commands.

use std::sync::Arc;

use sphero_protocol::Packet;

use crate::device::{expect_response, DeviceId};
use crate::error::{Error, Result};
use crate::session::SpheroSession;

/// Command ids for the system info subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemInfoCommand {
    /// Main application firmware version.
    GetMainApplicationVersion = 0x00,
    /// Bootloader version.
    GetBootloaderVersion = 0x01,
    /// Bluetooth MAC address.
    GetMacAddress = 0x06,
}

/// A firmware version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    /// Major version.
    pub major: u16,
    /// Minor version.
    pub minor: u16,
    /// Revision.
    pub revision: u16,
}

impl Version {
    /// Parse three big-endian u16s.
    fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < 6 {
            return Err(Error::BadResponse(format!(
                "version payload has {} bytes, expected 6",
                payload.len()
            )));
        }
        Ok(Version {
            major: u16::from_be_bytes([payload[0], payload[1]]),
            minor: u16::from_be_bytes([payload[2], payload[3]]),
            revision: u16::from_be_bytes([payload[4], payload[5]]),
        })
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.revision)
    }
}

/// Facade for the system info subsystem.
pub struct SystemInfo {
    session: Arc<SpheroSession>,
}

impl SystemInfo {
    /// Create the facade over a session.
    pub fn new(session: Arc<SpheroSession>) -> Self {
        SystemInfo { session }
    }

    fn command(&self, command: SystemInfoCommand) -> Result<Packet> {
        expect_response(
            self.session
                .request(Packet::command(DeviceId::SystemInfo as u8, command as u8))?,
        )
    }

    /// Version of the toy's main application firmware.
    pub fn main_application_version(&self) -> Result<Version> {
        let response = self.command(SystemInfoCommand::GetMainApplicationVersion)?;
        Version::from_payload(&response.payload)
    }

    /// Version of the toy's bootloader.
    pub fn bootloader_version(&self) -> Result<Version> {
        let response = self.command(SystemInfoCommand::GetBootloaderVersion)?;
        Version::from_payload(&response.payload)
    }

    /// Bluetooth MAC address as reported by the firmware.
    pub fn mac_address(&self) -> Result<String> {
        let response = self.command(SystemInfoCommand::GetMacAddress)?;
        String::from_utf8(response.payload)
            .map_err(|_| Error::BadResponse("mac address is not valid UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        let version = Version::from_payload(&[0x00, 0x06, 0x00, 0x02, 0x01, 0x44]).unwrap();
        assert_eq!(
            version,
            Version {
                major: 6,
                minor: 2,
                revision: 0x0144
            }
        );
        assert_eq!(version.to_string(), "6.2.324");
    }

    #[test]
    fn test_version_too_short() {
        assert!(matches!(
            Version::from_payload(&[0x00, 0x06]),
            Err(Error::BadResponse(_))
        ));
    }
}
