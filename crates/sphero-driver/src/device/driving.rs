//! Driving commands.

use std::sync::Arc;

use sphero_protocol::Packet;

use crate::device::{DeviceId, TARGET_MAIN_PROCESSOR};
use crate::error::Result;
use crate::session::SpheroSession;

/// Command ids for the driving subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DrivingCommand {
    /// Drive each motor independently.
    RawMotor = 0x01,
    /// Re-zero the yaw reference.
    ResetYaw = 0x06,
    /// Drive at a speed toward a heading.
    DriveWithHeading = 0x07,
    /// Select the stabilization control system.
    SetStabilization = 0x0C,
}

/// Motor rotation direction for heading-based driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Direction {
    /// Drive forward.
    Forward = 0x00,
    /// Drive in reverse.
    Reverse = 0x01,
}

/// Per-motor mode for raw motor control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RawMotorMode {
    /// Motor off.
    Off = 0x00,
    /// Spin forward.
    Forward = 0x01,
    /// Spin in reverse.
    Reverse = 0x02,
}

/// Stabilization control system selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StabilizationIndex {
    /// Stabilization off.
    NoControlSystem = 0x00,
    /// Full stabilization.
    FullControlSystem = 0x01,
    /// Pitch only.
    PitchControlSystem = 0x02,
    /// Roll only.
    RollControlSystem = 0x03,
    /// Yaw only.
    YawControlSystem = 0x04,
    /// Speed and yaw.
    SpeedAndYawControlSystem = 0x05,
}

/// Facade for the driving subsystem.
pub struct Driving {
    session: Arc<SpheroSession>,
}

impl Driving {
    /// Create the facade over a session.
    pub fn new(session: Arc<SpheroSession>) -> Self {
        Driving { session }
    }

    fn packet(&self, command: DrivingCommand) -> Packet {
        Packet::command(DeviceId::Driving as u8, command as u8)
            .with_target_id(TARGET_MAIN_PROCESSOR)
    }

    /// Drive at `speed` (0–255) toward `heading` (0–360 degrees).
    pub fn drive_with_heading(&self, speed: u8, heading: u16, direction: Direction) -> Result<()> {
        let heading = heading % 360;
        let heading_bytes = heading.to_be_bytes();
        self.session.request(
            self.packet(DrivingCommand::DriveWithHeading).with_payload(vec![
                speed,
                heading_bytes[0],
                heading_bytes[1],
                direction as u8,
            ]),
        )?;
        Ok(())
    }

    /// Control each motor separately.
    pub fn raw_motor(
        &self,
        left_mode: RawMotorMode,
        left_speed: u8,
        right_mode: RawMotorMode,
        right_speed: u8,
    ) -> Result<()> {
        self.session.request(
            self.packet(DrivingCommand::RawMotor).with_payload(vec![
                left_mode as u8,
                left_speed,
                right_mode as u8,
                right_speed,
            ]),
        )?;
        Ok(())
    }

    /// Re-zero the toy's yaw reference to its current orientation.
    pub fn reset_yaw(&self) -> Result<()> {
        self.session.request(self.packet(DrivingCommand::ResetYaw))?;
        Ok(())
    }

    /// Select the active stabilization control system.
    pub fn set_stabilization(&self, index: StabilizationIndex) -> Result<()> {
        self.session.request(
            self.packet(DrivingCommand::SetStabilization)
                .with_payload(vec![index as u8]),
        )?;
        Ok(())
    }
}
