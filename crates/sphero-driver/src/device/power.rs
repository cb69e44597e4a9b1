//! Power management commands.

use std::sync::Arc;
use std::time::Duration;

use sphero_protocol::Packet;

use crate::device::{expect_response, DeviceId};
use crate::error::Result;
use crate::session::SpheroSession;

/// Battery state queries can take the firmware a very long time to
/// answer, far beyond the ordinary request timeout.
const BATTERY_STATE_TIMEOUT: Duration = Duration::from_secs(1000);

/// Command ids for the power subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PowerCommand {
    /// Shut the toy down completely.
    EnterDeepSleep = 0x00,
    /// Put the toy into its normal soft sleep.
    EnterSoftSleep = 0x01,
    /// Battery voltage in centivolts.
    GetBatteryVoltage = 0x03,
    /// Wake the toy up.
    Wake = 0x0D,
    /// Coarse battery level.
    GetBatteryState = 0x17,
    /// Charger connection state.
    BatteryStateChanged = 0x1F,
}

/// Coarse battery level without known voltage thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryState {
    /// Charge is fine.
    Ok,
    /// Charge is low.
    Low,
    /// Charge is critically low.
    Critical,
    /// Value outside the published set.
    Unknown(u8),
}

impl From<u8> for BatteryState {
    fn from(value: u8) -> Self {
        match value {
            0x01 => BatteryState::Ok,
            0x02 => BatteryState::Low,
            0x03 => BatteryState::Critical,
            other => BatteryState::Unknown(other),
        }
    }
}

/// Charger connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerState {
    /// Not on a charger.
    NotCharging,
    /// Charging.
    Charging,
    /// On a charger and full.
    Charged,
    /// Value outside the published set.
    Unknown(u8),
}

impl From<u8> for ChargerState {
    fn from(value: u8) -> Self {
        match value {
            0x01 => ChargerState::NotCharging,
            0x02 => ChargerState::Charging,
            0x03 => ChargerState::Charged,
            other => ChargerState::Unknown(other),
        }
    }
}

/// Facade for the power subsystem.
pub struct Power {
    session: Arc<SpheroSession>,
}

impl Power {
    /// Create the facade over a session.
    pub fn new(session: Arc<SpheroSession>) -> Self {
        Power { session }
    }

    fn packet(&self, command: PowerCommand) -> Packet {
        Packet::command(DeviceId::Power as u8, command as u8)
    }

    /// Wake the toy from soft sleep.
    pub fn wake(&self) -> Result<()> {
        self.session.request(self.packet(PowerCommand::Wake))?;
        Ok(())
    }

    /// Put the toy into its normal sleep state.
    pub fn enter_soft_sleep(&self) -> Result<()> {
        self.session
            .request(self.packet(PowerCommand::EnterSoftSleep))?;
        Ok(())
    }

    /// Shut the toy down.
    pub fn enter_deep_sleep(&self) -> Result<()> {
        self.session
            .request(self.packet(PowerCommand::EnterDeepSleep))?;
        Ok(())
    }

    /// Battery voltage in volts.
    pub fn battery_voltage(&self) -> Result<f32> {
        let response = expect_response(
            self.session
                .request(self.packet(PowerCommand::GetBatteryVoltage))?,
        )?;
        let centivolts = response
            .payload
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | b as u32);
        Ok(centivolts as f32 / 100.0)
    }

    /// Coarse battery level. Uses an extended timeout; the firmware can
    /// be extremely slow to answer this query.
    pub fn battery_state(&self) -> Result<BatteryState> {
        let response = expect_response(self.session.send_request(
            self.packet(PowerCommand::GetBatteryState),
            true,
            BATTERY_STATE_TIMEOUT,
        )?)?;
        Ok(BatteryState::from(
            response.payload.first().copied().unwrap_or(0x00),
        ))
    }

    /// Charger connection state.
    pub fn charger_state(&self) -> Result<ChargerState> {
        let response = expect_response(
            self.session
                .request(self.packet(PowerCommand::BatteryStateChanged))?,
        )?;
        Ok(ChargerState::from(
            response.payload.first().copied().unwrap_or(0x00),
        ))
    }
}
