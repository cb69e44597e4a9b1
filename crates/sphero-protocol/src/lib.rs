//! Sphero API v2 Wire Protocol
//!
//! This crate provides types and utilities for the byte-level half of the
//! Sphero API v2 BLE protocol: building command frames, parsing inbound
//! frames, and reassembling frames from the arbitrarily chunked byte
//! stream a BLE stack delivers.
//!
//! # Protocol Overview
//!
//! Every exchange travels in one escaped, checksummed frame:
//!
//! ```text
//! +-------+-------+----------+----------+--------+---------+-----+---------+-------+-----+
//! | 0x8D  | flags | [target] | [source] | device | command | seq | payload | check | 0xD8|
//! +-------+-------+----------+----------+--------+---------+-----+---------+-------+-----+
//! ```
//!
//! - **Commands** (host → toy) carry a device id, command id, and
//!   parameters; most request a response and reset the toy's inactivity
//!   timeout.
//! - **Responses and notifications** (toy → host) set the response flag
//!   and carry a status code as their first payload byte.
//!
//! Responses are matched to commands by `(device_id, command_id)`, not by
//! sequence number.
//!
//! # Example
//!
//! ```rust
//! use sphero_protocol::{Packet, PacketCollector};
//!
//! // Build and encode a command.
//! let frame = Packet::command(0x16, 0x07)
//!     .with_target_id(0x12)
//!     .with_payload(vec![0x80, 0x00, 0xB4, 0x00])
//!     .encode();
//!
//! // Reassemble whatever the BLE stack hands back.
//! let mut collector = PacketCollector::new();
//! for packet in collector.feed(&frame) {
//!     println!("{packet}");
//! }
//! ```

mod collector;
mod constants;
mod error;
mod packet;
mod types;

pub use collector::*;
pub use constants::*;
pub use error::*;
pub use packet::*;
pub use types::*;
