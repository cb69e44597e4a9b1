//! Sphero API v2 Session Layer
//!
//! This crate drives a Sphero toy over any byte transport implementing
//! the [`Transport`] trait. It layers three things on top of the wire
//! protocol in `sphero-protocol`:
//!
//! - a **receiver thread** that reassembles the toy's chunked notification
//!   stream into packets,
//! - a **response router** that correlates inbound packets to blocking
//!   requests and long-lived notification subscriptions by
//!   `(device_id, command_id)`,
//! - **device facades** that turn semantic calls (drive, LEDs, battery,
//!   sensors, animations) into packets.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sphero_driver::{Direction, Sphero};
//!
//! let transport: Arc<dyn sphero_driver::Transport> = connect_ble_backend()?;
//! let toy = Sphero::connect(transport);
//!
//! toy.power().wake()?;
//! toy.driving().drive_with_heading(120, 90, Direction::Forward)?;
//! toy.close();
//! ```
//!
//! Toys enforce an inactivity timeout and will sleep or disconnect when
//! no qualifying command arrives; most commands reset that timer via
//! their default flags.

mod device;
mod error;
mod router;
mod session;
mod sphero;
mod transport;

pub use device::*;
pub use error::*;
pub use session::*;
pub use sphero::*;
pub use transport::*;
