//! Packet encoding and decoding.
//!
//! Every API v2 exchange is carried in an escaped, checksummed frame:
//!
//! ```text
//! +-------+-------+----------+----------+--------+--------+-----+---------+-------+-----+
//! | start | flags | [target] | [source] | device | command| seq | payload | check | end |
//! +-------+-------+----------+----------+--------+--------+-----+---------+-------+-----+
//! ```
//!
//! The optional target/source id bytes are present only when the matching
//! `FLAG_HAS_*` bit is set, and the wire carries target before source; the
//! decoder pops them in the same order. The checksum is computed over the
//! unescaped span from the flags byte through the last payload byte, and
//! any occurrence of a reserved byte in the span or checksum is escaped as
//! `ESCAPE, value & !ESCAPE_MASK`.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::types::{ApiError, CorrelationKey};

/// A single protocol exchange unit, either a command built by the host or
/// a response/notification parsed from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Flag bitmask (`FLAG_*` constants).
    pub flags: u8,
    /// Optional routing target (e.g. 0x12 for the main processor).
    pub target_id: Option<u8>,
    /// Optional routing source.
    pub source_id: Option<u8>,
    /// Device (subsystem) id.
    pub device_id: u8,
    /// Command id within the device.
    pub command_id: u8,
    /// Sequence number, assigned at send time.
    pub sequence: u8,
    /// Command parameters or response data. For responses the leading
    /// status byte has already been split off into `api_error`.
    pub payload: Vec<u8>,
    /// Status code extracted from the first payload byte at decode time
    /// when the `FLAG_RESPONSE` bit is set.
    api_error: Option<ApiError>,
}

impl Packet {
    /// Create a command packet with the default flags
    /// (`REQUESTS_RESPONSE | RESETS_INACTIVITY_TIMEOUT`).
    pub fn command(device_id: u8, command_id: u8) -> Self {
        Packet {
            flags: DEFAULT_FLAGS,
            target_id: None,
            source_id: None,
            device_id,
            command_id,
            sequence: 0,
            payload: Vec::new(),
            api_error: None,
        }
    }

    /// Replace the flag bitmask entirely.
    pub fn with_flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    /// Set the target id and the `FLAG_HAS_TARGET_ID` bit.
    pub fn with_target_id(mut self, target_id: u8) -> Self {
        self.target_id = Some(target_id);
        self.flags |= FLAG_HAS_TARGET_ID;
        self
    }

    /// Set the source id and the `FLAG_HAS_SOURCE_ID` bit.
    pub fn with_source_id(mut self, source_id: u8) -> Self {
        self.source_id = Some(source_id);
        self.flags |= FLAG_HAS_SOURCE_ID;
        self
    }

    /// Set the payload bytes.
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Set the sequence number (normally done by the session at send time).
    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence;
        self
    }

    /// The `(device_id, command_id)` pair used to correlate responses.
    pub fn correlation_key(&self) -> CorrelationKey {
        (self.device_id, self.command_id)
    }

    /// Whether this packet is a reply rather than a command.
    pub fn is_response(&self) -> bool {
        self.flags & FLAG_RESPONSE != 0
    }

    /// Whether the sender expects any response at all.
    pub fn wants_response(&self) -> bool {
        self.flags & (FLAG_REQUESTS_RESPONSE | FLAG_REQUESTS_ONLY_ERROR_RESPONSE) != 0
    }

    /// Status code of a response packet. Commands and responses with an
    /// empty payload report `Success`. Idempotent: the status byte is
    /// split off the payload once, at decode time.
    pub fn api_error(&self) -> ApiError {
        self.api_error.unwrap_or(ApiError::Success)
    }

    /// The unescaped field span the checksum covers:
    /// `[flags, target?, source?, device, command, sequence, payload...]`.
    fn field_span(&self) -> Vec<u8> {
        let mut span = Vec::with_capacity(6 + self.payload.len());
        span.push(self.flags);

        if self.flags & FLAG_HAS_TARGET_ID != 0 {
            if let Some(target_id) = self.target_id {
                span.push(target_id);
            }
        }

        if self.flags & FLAG_HAS_SOURCE_ID != 0 {
            if let Some(source_id) = self.source_id {
                span.push(source_id);
            }
        }

        span.push(self.device_id);
        span.push(self.command_id);
        span.push(self.sequence);
        span.extend_from_slice(&self.payload);
        span
    }

    /// Checksum over the field span: `0xFF - (sum & 0xFF)`.
    pub fn checksum(&self) -> u8 {
        checksum_of(&self.field_span())
    }

    /// Encode the packet to a complete escaped frame ready for the
    /// transport.
    pub fn encode(&self) -> Vec<u8> {
        let span = self.field_span();
        let checksum = checksum_of(&span);

        let mut frame = Vec::with_capacity(span.len() + 4);
        frame.push(START_OF_PACKET);
        for &b in span.iter().chain(std::iter::once(&checksum)) {
            if RESERVED_BYTES.contains(&b) {
                frame.push(ESCAPE);
                frame.push(b & !ESCAPE_MASK);
            } else {
                frame.push(b);
            }
        }
        frame.push(END_OF_PACKET);
        frame
    }

    /// Decode a complete raw frame (start marker through end marker,
    /// escapes intact) into a packet.
    pub fn decode(raw: &[u8]) -> Result<Packet, ProtocolError> {
        Packet::from_unescaped(&unescape(raw)?)
    }

    /// Parse a frame whose escapes have already been resolved.
    pub(crate) fn from_unescaped(frame: &[u8]) -> Result<Packet, ProtocolError> {
        if frame.len() < MIN_FRAME_SIZE {
            return Err(ProtocolError::FrameTooShort {
                expected: MIN_FRAME_SIZE,
                actual: frame.len(),
            });
        }

        let start = frame[0];
        if start != START_OF_PACKET {
            return Err(ProtocolError::BadStartByte(start));
        }
        let end = frame[frame.len() - 1];
        if end != END_OF_PACKET {
            return Err(ProtocolError::BadEndByte(end));
        }

        let received_checksum = frame[frame.len() - 2];
        let mut middle = frame[1..frame.len() - 2].iter().copied();
        let too_short = || ProtocolError::FrameTooShort {
            expected: MIN_FRAME_SIZE,
            actual: frame.len(),
        };

        let flags = middle.next().ok_or_else(too_short)?;

        // Target is popped before source; this matches the wire order and
        // is a protocol contract, not a stylistic choice.
        let target_id = if flags & FLAG_HAS_TARGET_ID != 0 {
            Some(middle.next().ok_or_else(too_short)?)
        } else {
            None
        };
        let source_id = if flags & FLAG_HAS_SOURCE_ID != 0 {
            Some(middle.next().ok_or_else(too_short)?)
        } else {
            None
        };

        let device_id = middle.next().ok_or_else(too_short)?;
        let command_id = middle.next().ok_or_else(too_short)?;
        let sequence = middle.next().ok_or_else(too_short)?;

        let mut packet = Packet {
            flags,
            target_id,
            source_id,
            device_id,
            command_id,
            sequence,
            payload: middle.collect(),
            api_error: None,
        };

        let computed = packet.checksum();
        if computed != received_checksum {
            return Err(ProtocolError::ChecksumMismatch {
                expected: received_checksum,
                actual: computed,
            });
        }

        // Responses carry their status code as the first payload byte;
        // split it off now so the payload the caller sees is pure data.
        if packet.is_response() && !packet.payload.is_empty() {
            let code = packet.payload.remove(0);
            packet.api_error = Some(ApiError::from(code));
        }

        Ok(packet)
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Packet(flg: 0x{:02X} did: 0x{:02X} cid: 0x{:02X} seq: 0x{:02X})",
            self.flags, self.device_id, self.command_id, self.sequence
        )
    }
}

/// Checksum over an unescaped field span.
fn checksum_of(span: &[u8]) -> u8 {
    0xFF - (span.iter().fold(0u32, |acc, &b| acc + b as u32) & 0xFF) as u8
}

/// Resolve escape sequences in a raw frame.
///
/// An `ESCAPE` byte is dropped and the following byte has `ESCAPE_MASK`
/// OR'd back in; any other value after an escape is a framing error.
fn unescape(raw: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.iter().copied();
    while let Some(b) = bytes.next() {
        if b == ESCAPE {
            let escaped = bytes.next().ok_or(ProtocolError::BadEscapeByte(ESCAPE))?;
            if !ESCAPED_BYTES.contains(&escaped) {
                return Err(ProtocolError::BadEscapeByte(escaped));
            }
            out.push(escaped | ESCAPE_MASK);
        } else {
            out.push(b);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_defaults() {
        let packet = Packet::command(0x23, 0x42);
        assert_eq!(packet.device_id, 0x23);
        assert_eq!(packet.command_id, 0x42);
        assert_eq!(packet.flags, 0x0A);
        assert_eq!(packet.target_id, None);
        assert_eq!(packet.source_id, None);
        assert!(packet.payload.is_empty());
        assert!(packet.wants_response());
        assert!(!packet.is_response());
    }

    #[test]
    fn test_target_id_sets_flag() {
        let packet = Packet::command(0x23, 0x42).with_target_id(0x01);
        assert_eq!(packet.flags, 0x1A);
        assert_eq!(packet.target_id, Some(0x01));
    }

    #[test]
    fn test_source_id_sets_flag() {
        let packet = Packet::command(0x23, 0x42).with_source_id(0x01);
        assert_eq!(packet.flags, 0x2A);
        assert_eq!(packet.source_id, Some(0x01));
    }

    #[test]
    fn test_correlation_key() {
        let packet = Packet::command(0x23, 0x42);
        assert_eq!(packet.correlation_key(), (0x23, 0x42));
    }

    #[test]
    fn test_encode_known_vector() {
        let packet = Packet::command(0x23, 0x42)
            .with_sequence(0x01)
            .with_payload(vec![0x15, 0x16]);
        assert_eq!(packet.checksum(), 0x64);
        assert_eq!(
            packet.encode(),
            vec![0x8D, 0x0A, 0x23, 0x42, 0x01, 0x15, 0x16, 0x64, 0xD8]
        );
    }

    #[test]
    fn test_encode_escaped_vector() {
        let packet = Packet::command(0x23, 0x42)
            .with_sequence(0x01)
            .with_payload(vec![0xAB, 0x8D]);
        assert_eq!(
            packet.encode(),
            vec![0x8D, 0x0A, 0x23, 0x42, 0x01, 0xAB, 0x23, 0xAB, 0x05, 0x57, 0xD8]
        );
    }

    #[test]
    fn test_roundtrip_plain() {
        let packet = Packet::command(0x16, 0x07)
            .with_target_id(0x12)
            .with_sequence(0x2A)
            .with_payload(vec![0x80, 0x00, 0xB4, 0x00]);

        let decoded = Packet::decode(&packet.encode()).unwrap();
        assert_eq!(decoded.flags, packet.flags);
        assert_eq!(decoded.target_id, packet.target_id);
        assert_eq!(decoded.source_id, packet.source_id);
        assert_eq!(decoded.device_id, packet.device_id);
        assert_eq!(decoded.command_id, packet.command_id);
        assert_eq!(decoded.sequence, packet.sequence);
        assert_eq!(decoded.payload, packet.payload);
    }

    #[test]
    fn test_roundtrip_both_ids() {
        let packet = Packet::command(0x18, 0x02)
            .with_target_id(0x11)
            .with_source_id(0x01)
            .with_sequence(0xFE)
            .with_payload(vec![0x01, 0x02, 0x03]);

        let decoded = Packet::decode(&packet.encode()).unwrap();
        assert_eq!(decoded.target_id, Some(0x11));
        assert_eq!(decoded.source_id, Some(0x01));
        assert_eq!(decoded.payload, vec![0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_roundtrip_reserved_payload() {
        // Every reserved byte in every position must survive escaping.
        let packet = Packet::command(0x13, 0x03)
            .with_sequence(0x8D)
            .with_payload(vec![0x8D, 0xD8, 0xAB, 0x00, 0xAB, 0xD8, 0x8D]);

        let decoded = Packet::decode(&packet.encode()).unwrap();
        assert_eq!(decoded.sequence, 0x8D);
        assert_eq!(
            decoded.payload,
            vec![0x8D, 0xD8, 0xAB, 0x00, 0xAB, 0xD8, 0x8D]
        );
    }

    #[test]
    fn test_checksum_sensitivity() {
        let frame = Packet::command(0x23, 0x42)
            .with_sequence(0x01)
            .with_payload(vec![0x15, 0x16])
            .encode();

        // Flip one bit in each inner byte (skipping flips that would
        // collide with a reserved byte and change the framing instead).
        for i in 1..frame.len() - 1 {
            for bit in 0..8 {
                let mut corrupt = frame.clone();
                corrupt[i] ^= 1 << bit;
                if RESERVED_BYTES.contains(&corrupt[i]) {
                    continue;
                }
                assert!(
                    matches!(
                        Packet::decode(&corrupt),
                        Err(ProtocolError::ChecksumMismatch { .. })
                    ),
                    "flip at byte {i} bit {bit} was not caught"
                );
            }
        }
    }

    #[test]
    fn test_decode_bad_markers() {
        let mut frame = Packet::command(0x23, 0x42).encode();
        frame[0] = 0x00;
        assert!(matches!(
            Packet::decode(&frame),
            Err(ProtocolError::BadStartByte(0x00))
        ));

        let mut frame = Packet::command(0x23, 0x42).encode();
        let last = frame.len() - 1;
        frame[last] = 0x00;
        assert!(matches!(
            Packet::decode(&frame),
            Err(ProtocolError::BadEndByte(0x00))
        ));
    }

    #[test]
    fn test_decode_bad_escape() {
        // ESCAPE followed by a value that is not an escaped reserved byte.
        let frame = vec![0x8D, 0x0A, 0xAB, 0x42, 0x01, 0x00, 0xD8];
        assert!(matches!(
            Packet::decode(&frame),
            Err(ProtocolError::BadEscapeByte(0x42))
        ));
    }

    #[test]
    fn test_decode_too_short() {
        assert!(matches!(
            Packet::decode(&[0x8D, 0x0A, 0x64, 0xD8]),
            Err(ProtocolError::FrameTooShort { .. })
        ));
    }

    #[test]
    fn test_api_error_extracted_once() {
        let response = Packet::command(0x23, 0x42)
            .with_flags(FLAG_RESPONSE)
            .with_sequence(0x01)
            .with_payload(vec![0x00, 0x16]);
        let decoded = Packet::decode(&response.encode()).unwrap();

        assert_eq!(decoded.api_error(), ApiError::Success);
        assert_eq!(decoded.payload, vec![0x16]);
        // Re-reading does not pop further bytes.
        assert_eq!(decoded.api_error(), ApiError::Success);
        assert_eq!(decoded.payload.len(), 1);
    }

    #[test]
    fn test_api_error_unknown_code() {
        let response = Packet::command(0x23, 0x42)
            .with_flags(FLAG_RESPONSE)
            .with_sequence(0x01)
            .with_payload(vec![0x15, 0x16]);
        let decoded = Packet::decode(&response.encode()).unwrap();

        assert_eq!(decoded.api_error(), ApiError::Unknown(0x15));
        assert_eq!(decoded.payload, vec![0x16]);
    }

    #[test]
    fn test_api_error_not_extracted_from_commands() {
        let command = Packet::command(0x23, 0x42)
            .with_sequence(0x01)
            .with_payload(vec![0x00, 0x16]);
        let decoded = Packet::decode(&command.encode()).unwrap();

        assert_eq!(decoded.api_error(), ApiError::Success);
        assert_eq!(decoded.payload, vec![0x00, 0x16]);
    }

    #[test]
    fn test_display() {
        let packet = Packet::command(0x23, 0x42).with_sequence(0x01);
        assert_eq!(
            packet.to_string(),
            "Packet(flg: 0x0A did: 0x23 cid: 0x42 seq: 0x01)"
        );
    }
}
