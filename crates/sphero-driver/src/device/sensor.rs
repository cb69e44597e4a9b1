//! Sensor telemetry commands and streaming.
//!
//! The toy streams sensor data as notifications on the
//! `SensorStreamingData` key: each notification payload is a sequence of
//! big-endian `f32` values, one per enabled sensor parameter, ordered by
//! descending mask bit.

use std::sync::Arc;
use std::time::Duration;

use sphero_protocol::Packet;

use crate::device::{DeviceId, TARGET_MAIN_PROCESSOR};
use crate::error::Result;
use crate::session::{NotifyControl, SpheroSession};

/// Command ids for the sensor subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorCommand {
    /// Select which sensors stream.
    SetSensorStreamingMask = 0x00,
    /// Notification carrying one streaming sample.
    SensorStreamingData = 0x02,
    /// Reset the locator origin to the current position.
    ResetLocator = 0x13,
}

// ============================================================================
// Streaming mask bits
// ============================================================================

/// Quaternion x, y, z, w.
pub const MASK_QUATERNION: u32 = 0x2000000 | 0x1000000 | 0x800000 | 0x400000;
/// Attitude pitch, roll, yaw.
pub const MASK_ATTITUDE: u32 = 0x40000 | 0x20000 | 0x10000;
/// Accelerometer x, y, z.
pub const MASK_ACCELEROMETER: u32 = 0x8000 | 0x4000 | 0x2000;
/// Combined acceleration magnitude.
pub const MASK_ACCEL_ONE: u32 = 0x200;
/// Locator x, y.
pub const MASK_LOCATOR: u32 = 0x40 | 0x20;
/// Velocity x, y.
pub const MASK_VELOCITY: u32 = 0x10 | 0x08;
/// Ground speed.
pub const MASK_SPEED: u32 = 0x04;
/// Firmware clock.
pub const MASK_CORE_TIME: u32 = 0x02;

/// Facade for the sensor subsystem.
pub struct Sensor {
    session: Arc<SpheroSession>,
}

impl Sensor {
    /// Create the facade over a session.
    pub fn new(session: Arc<SpheroSession>) -> Self {
        Sensor { session }
    }

    /// Start streaming the sensors selected by `mask`.
    ///
    /// The subscription is registered before the mask command is sent so
    /// no early sample is lost. `interval_ms` is the sample period;
    /// `count` of zero streams until stopped. The callback receives the
    /// decoded `f32` values of each sample, or `None` when `timeout`
    /// passes without one.
    pub fn start_streaming<F>(
        &self,
        mask: u32,
        interval_ms: u16,
        count: u8,
        timeout: Duration,
        mut callback: F,
    ) -> Result<()>
    where
        F: FnMut(Option<Vec<f32>>) -> NotifyControl + Send + 'static,
    {
        let template = Packet::command(
            DeviceId::Sensors as u8,
            SensorCommand::SensorStreamingData as u8,
        );
        self.session.start_notify(&template, timeout, move |packet| {
            callback(packet.map(|p| decode_sample(&p.payload)))
        })?;

        let interval = interval_ms.to_be_bytes();
        let mask_bytes = mask.to_be_bytes();
        let request = self.session.request(
            Packet::command(
                DeviceId::Sensors as u8,
                SensorCommand::SetSensorStreamingMask as u8,
            )
            .with_target_id(TARGET_MAIN_PROCESSOR)
            .with_payload(vec![
                interval[0],
                interval[1],
                count,
                mask_bytes[0],
                mask_bytes[1],
                mask_bytes[2],
                mask_bytes[3],
            ]),
        );
        if let Err(err) = request {
            // The toy never accepted the mask, so the subscription just
            // registered must not stay behind blocking a retry.
            let _ = self.session.cancel_notify(template.correlation_key());
            return Err(err);
        }
        Ok(())
    }

    /// Stop the streaming subscription.
    pub fn stop_streaming(&self) -> Result<()> {
        self.session.cancel_notify((
            DeviceId::Sensors as u8,
            SensorCommand::SensorStreamingData as u8,
        ))
    }

    /// Reset the locator origin to the toy's current position.
    pub fn reset_locator(&self) -> Result<()> {
        self.session.request(
            Packet::command(DeviceId::Sensors as u8, SensorCommand::ResetLocator as u8)
                .with_target_id(TARGET_MAIN_PROCESSOR),
        )?;
        Ok(())
    }
}

/// Decode one streaming sample: groups of four bytes as big-endian f32,
/// short trailing groups zero-padded.
fn decode_sample(payload: &[u8]) -> Vec<f32> {
    payload
        .chunks(4)
        .map(|chunk| {
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            f32::from_be_bytes(bytes)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sample() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1.5f32.to_be_bytes());
        payload.extend_from_slice(&(-0.25f32).to_be_bytes());

        let values = decode_sample(&payload);
        assert_eq!(values, vec![1.5, -0.25]);
    }

    #[test]
    fn test_decode_sample_pads_short_group() {
        let values = decode_sample(&[0x3F, 0xC0]);
        assert_eq!(values, vec![1.5]);
    }

    #[test]
    fn test_mask_composition() {
        assert_eq!(MASK_QUATERNION, 0x3C00000);
        assert_eq!(MASK_ATTITUDE, 0x70000);
        assert_eq!(MASK_ACCELEROMETER, 0xE000);
    }
}
