//! User I/O commands: LEDs and audio.

use std::sync::Arc;

use sphero_protocol::Packet;

use crate::device::{expect_response, DeviceId, TARGET_MAIN_PROCESSOR, TARGET_NORDIC_PROCESSOR};
use crate::error::Result;
use crate::session::SpheroSession;

/// Command ids for the user I/O subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UserIoCommand {
    /// Set the audio playback volume.
    SetAudioVolume = 0x08,
    /// Read the audio playback volume.
    GetAudioVolume = 0x09,
    /// Set front and back LEDs via an 8-bit channel mask.
    SetAllLeds8BitMask = 0x1C,
    /// Fill the LED matrix with one color.
    SetLedMatrixOneColor = 0x2F,
}

/// Individual LED channel bits for the 8-bit mask commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Led {
    /// Front red channel.
    FrontRed = 0x01,
    /// Front green channel.
    FrontGreen = 0x02,
    /// Front blue channel.
    FrontBlue = 0x04,
    /// Back red channel.
    BackRed = 0x08,
    /// Back green channel.
    BackGreen = 0x10,
    /// Back blue channel.
    BackBlue = 0x20,
}

/// All six LED channels.
pub const LED_ALL: u8 = Led::FrontRed as u8
    | Led::FrontGreen as u8
    | Led::FrontBlue as u8
    | Led::BackRed as u8
    | Led::BackGreen as u8
    | Led::BackBlue as u8;

/// An RGB color triple.
pub type Rgb = (u8, u8, u8);

/// Facade for the user I/O subsystem.
pub struct UserIo {
    session: Arc<SpheroSession>,
}

impl UserIo {
    /// Create the facade over a session.
    pub fn new(session: Arc<SpheroSession>) -> Self {
        UserIo { session }
    }

    /// Set the front and back LEDs.
    pub fn set_all_leds(&self, front: Rgb, back: Rgb) -> Result<()> {
        self.session.request(
            Packet::command(DeviceId::UserIo as u8, UserIoCommand::SetAllLeds8BitMask as u8)
                .with_target_id(TARGET_NORDIC_PROCESSOR)
                .with_payload(vec![
                    LED_ALL, front.0, front.1, front.2, back.0, back.1, back.2,
                ]),
        )?;
        Ok(())
    }

    /// Fill the whole LED matrix with one color.
    pub fn set_led_matrix_one_color(&self, color: Rgb) -> Result<()> {
        self.session.request(
            Packet::command(
                DeviceId::UserIo as u8,
                UserIoCommand::SetLedMatrixOneColor as u8,
            )
            .with_target_id(TARGET_MAIN_PROCESSOR)
            .with_payload(vec![color.0, color.1, color.2]),
        )?;
        Ok(())
    }

    /// Set the audio playback volume (0–255).
    pub fn set_audio_volume(&self, volume: u8) -> Result<()> {
        self.session.request(
            Packet::command(DeviceId::UserIo as u8, UserIoCommand::SetAudioVolume as u8)
                .with_target_id(TARGET_NORDIC_PROCESSOR)
                .with_payload(vec![volume]),
        )?;
        Ok(())
    }

    /// Read the audio playback volume.
    pub fn audio_volume(&self) -> Result<u8> {
        let response = expect_response(self.session.request(
            Packet::command(DeviceId::UserIo as u8, UserIoCommand::GetAudioVolume as u8)
                .with_target_id(TARGET_NORDIC_PROCESSOR),
        )?)?;
        Ok(response.payload.first().copied().unwrap_or(0))
    }
}
