//! Protocol constants
//!
//! These constants define the framing bytes, flag bits, status codes, and
//! GATT identifiers used by the Sphero API v2 protocol.

// ============================================================================
// Framing
// ============================================================================

/// First byte of every frame.
pub const START_OF_PACKET: u8 = 0x8D;
/// Last byte of every frame.
pub const END_OF_PACKET: u8 = 0xD8;
/// Escape marker; the next byte carries the payload value with
/// `ESCAPE_MASK` cleared.
pub const ESCAPE: u8 = 0xAB;
/// Bit pattern cleared when escaping a reserved byte and OR'd back in when
/// unescaping.
pub const ESCAPE_MASK: u8 = 0x88;

/// The three byte values that must never appear unescaped between the start
/// and end markers.
pub const RESERVED_BYTES: [u8; 3] = [START_OF_PACKET, END_OF_PACKET, ESCAPE];

/// The escaped forms of the reserved bytes (reserved value with
/// `ESCAPE_MASK` cleared). Only these values may follow an `ESCAPE` byte.
pub const ESCAPED_BYTES: [u8; 3] = [
    START_OF_PACKET & !ESCAPE_MASK,
    END_OF_PACKET & !ESCAPE_MASK,
    ESCAPE & !ESCAPE_MASK,
];

/// Lower bound on a raw frame; anything shorter cannot hold the mandatory
/// fields and is discarded as garbage.
pub const MIN_FRAME_SIZE: usize = 6;

/// Largest frame the driver will hand to a transport in one write.
pub const MAX_FRAME_SIZE: usize = 256;

// ============================================================================
// Flag Bits
// ============================================================================

/// Packet is a reply rather than a command.
pub const FLAG_RESPONSE: u8 = 0x01;
/// Sender expects a response.
pub const FLAG_REQUESTS_RESPONSE: u8 = 0x02;
/// Sender expects a response only on error.
pub const FLAG_REQUESTS_ONLY_ERROR_RESPONSE: u8 = 0x04;
/// Command resets the device's inactivity sleep timer.
pub const FLAG_RESETS_INACTIVITY_TIMEOUT: u8 = 0x08;
/// A target id byte is present on the wire.
pub const FLAG_HAS_TARGET_ID: u8 = 0x10;
/// A source id byte is present on the wire.
pub const FLAG_HAS_SOURCE_ID: u8 = 0x20;

/// Flags applied to a command when none are given explicitly.
pub const DEFAULT_FLAGS: u8 = FLAG_REQUESTS_RESPONSE | FLAG_RESETS_INACTIVITY_TIMEOUT;

// ============================================================================
// API Error Codes (first payload byte of a response)
// ============================================================================

/// Command succeeded.
pub const API_ERROR_SUCCESS: u8 = 0x00;
/// Unknown device id.
pub const API_ERROR_BAD_DEVICE_ID: u8 = 0x01;
/// Unknown command id for the device.
pub const API_ERROR_BAD_COMMAND_ID: u8 = 0x02;
/// Command recognized but not implemented by this firmware.
pub const API_ERROR_NOT_YET_IMPLEMENTED: u8 = 0x03;
/// Command requires elevated access.
pub const API_ERROR_COMMAND_IS_RESTRICTED: u8 = 0x04;
/// Payload length does not match the command.
pub const API_ERROR_BAD_DATA_LENGTH: u8 = 0x05;
/// Firmware failed to execute the command.
pub const API_ERROR_COMMAND_FAILED: u8 = 0x06;
/// A parameter value is out of range.
pub const API_ERROR_BAD_PARAMETER_VALUE: u8 = 0x07;
/// Device is busy; retry later.
pub const API_ERROR_BUSY: u8 = 0x08;
/// Unknown target id.
pub const API_ERROR_BAD_TARGET_ID: u8 = 0x09;
/// Target exists but cannot be reached.
pub const API_ERROR_TARGET_UNAVAILABLE: u8 = 0x0A;

// ============================================================================
// GATT Identifiers
// ============================================================================

/// Characteristic carrying API v2 frames in both directions.
pub const API_V2_CHARACTERISTIC: &str = "00010002-574f-4f20-5370-6865726f2121";
/// "Use the force" anti-sleep characteristic some toys require at connect.
pub const FORCE_BAND_CHARACTERISTIC: &str = "00020005-574f-4f20-5370-6865726f2121";
/// Magic string written to the force-band characteristic.
pub const FORCE_BAND_PAYLOAD: &[u8] = b"usetheforce...band";
/// Client characteristic configuration descriptor (enables notifications).
pub const CCCD_UUID: u16 = 0x2902;
/// Generic device name characteristic.
pub const DEVICE_NAME_UUID: u16 = 0x2A00;
