//! Animatronics commands: canned animations and articulated parts.

use std::sync::Arc;
use std::time::Duration;

use sphero_protocol::Packet;

use crate::device::{DeviceId, TARGET_MAIN_PROCESSOR};
use crate::error::Result;
use crate::session::{NotifyControl, SpheroSession};

/// Command ids for the animatronics subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AnimatronicsCommand {
    /// Play a canned animation.
    PlayAnimation = 0x05,
    /// Move the legs through a canned action.
    PerformLegAction = 0x0D,
    /// Notification sent when an animation finishes.
    PlayAnimationCompleteNotify = 0x11,
    /// Stop the running animation.
    StopAnimation = 0x2B,
}

/// Canned leg actions (R2-D2 style toys).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LegAction {
    /// Stop moving.
    Stop = 0x00,
    /// Deploy the third leg.
    ThreeLegs = 0x01,
    /// Retract the third leg.
    TwoLegs = 0x02,
    /// Waddle walk.
    Waddle = 0x03,
}

/// Facade for the animatronics subsystem.
pub struct Animatronics {
    session: Arc<SpheroSession>,
}

impl Animatronics {
    /// Create the facade over a session.
    pub fn new(session: Arc<SpheroSession>) -> Self {
        Animatronics { session }
    }

    fn packet(&self, command: AnimatronicsCommand) -> Packet {
        Packet::command(DeviceId::Animatronics as u8, command as u8)
            .with_target_id(TARGET_MAIN_PROCESSOR)
    }

    /// Play a canned animation by id.
    pub fn play_animation(&self, animation_id: u8) -> Result<()> {
        self.session.request(
            self.packet(AnimatronicsCommand::PlayAnimation)
                .with_payload(vec![animation_id]),
        )?;
        Ok(())
    }

    /// Stop the currently running animation.
    pub fn stop_animation(&self) -> Result<()> {
        self.session
            .request(self.packet(AnimatronicsCommand::StopAnimation))?;
        Ok(())
    }

    /// Move the legs through a canned action.
    pub fn perform_leg_action(&self, action: LegAction) -> Result<()> {
        self.session.request(
            self.packet(AnimatronicsCommand::PerformLegAction)
                .with_payload(vec![action as u8]),
        )?;
        Ok(())
    }

    /// Subscribe to animation-completion notifications.
    ///
    /// The callback receives `Some(animation_id)` when an animation
    /// finishes and `None` when a wait interval expires without one.
    pub fn on_animation_complete<F>(&self, timeout: Duration, mut callback: F) -> Result<()>
    where
        F: FnMut(Option<u8>) -> NotifyControl + Send + 'static,
    {
        let template = Packet::command(
            DeviceId::Animatronics as u8,
            AnimatronicsCommand::PlayAnimationCompleteNotify as u8,
        );
        self.session.start_notify(&template, timeout, move |packet| {
            callback(packet.and_then(|p| p.payload.first().copied()))
        })
    }

    /// Stop the animation-completion subscription.
    pub fn cancel_animation_complete_notify(&self) -> Result<()> {
        self.session.cancel_notify((
            DeviceId::Animatronics as u8,
            AnimatronicsCommand::PlayAnimationCompleteNotify as u8,
        ))
    }
}
