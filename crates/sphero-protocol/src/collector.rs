//! Stream reassembly.
//!
//! BLE notifications deliver raw bytes in arbitrary chunks: one chunk may
//! hold a fragment of a frame, exactly one frame, or several frames. The
//! [`PacketCollector`] accumulates bytes across chunks and materializes a
//! [`Packet`] every time an end marker is seen.
//!
//! Malformed data never kills the stream: leading garbage, bad escape
//! sequences, undersized frames, and checksum failures are logged with
//! `warn!` and the collector resynchronizes on the next start marker.

use bytes::{BufMut, BytesMut};
use log::{debug, warn};

use crate::constants::*;
use crate::packet::Packet;

/// Stateful per-connection reassembler. Feed it every received chunk in
/// arrival order; it returns the packets completed by that chunk.
#[derive(Debug, Default)]
pub struct PacketCollector {
    /// Unescaped bytes of the frame currently being assembled, start
    /// marker included.
    buffer: BytesMut,
    /// True immediately after consuming an escape byte.
    escaped: bool,
    /// True while skipping garbage in search of a start marker, so a run
    /// of junk produces one warning instead of one per byte.
    discarding: bool,
}

impl PacketCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        PacketCollector {
            buffer: BytesMut::with_capacity(MAX_FRAME_SIZE),
            escaped: false,
            discarding: false,
        }
    }

    /// Number of bytes buffered for the frame in progress.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partially assembled frame.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.escaped = false;
        self.discarding = false;
    }

    /// Consume one received chunk and return every packet it completed.
    ///
    /// State persists between calls: a frame may be split across any
    /// number of chunks and bytes are processed in strict arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Packet> {
        let mut completed = Vec::new();

        for &b in chunk {
            if b == START_OF_PACKET && !self.escaped {
                if !self.buffer.is_empty() {
                    warn!(
                        "start marker inside a frame after {} bytes; dropping partial frame",
                        self.buffer.len()
                    );
                }
                self.buffer.clear();
                self.escaped = false;
                self.discarding = false;
                self.buffer.put_u8(b);
                continue;
            }

            if self.buffer.is_empty() {
                // A stream must always begin a packet with the start
                // marker; resynchronize by discarding until one appears.
                if !self.discarding {
                    warn!("byte 0x{:02X} outside a frame; discarding until next start marker", b);
                    self.discarding = true;
                }
                continue;
            }

            if b == ESCAPE {
                if self.escaped {
                    // The second escape byte is garbage too; clear
                    // everything so the next start marker is honored.
                    warn!("escape byte following an escape byte; dropping frame");
                    self.clear();
                    continue;
                }
                self.escaped = true;
                continue;
            }

            if self.escaped {
                self.escaped = false;
                if !ESCAPED_BYTES.contains(&b) {
                    warn!("bad escape sequence 0x{:02X}; dropping frame", b);
                    self.clear();
                    continue;
                }
                // An escaped end marker is payload, never a terminator.
                self.buffer.put_u8(b | ESCAPE_MASK);
                continue;
            }

            self.buffer.put_u8(b);

            if b == END_OF_PACKET {
                if self.buffer.len() < MIN_FRAME_SIZE {
                    warn!("dropping undersized frame of {} bytes", self.buffer.len());
                } else {
                    match Packet::from_unescaped(&self.buffer) {
                        Ok(packet) => {
                            debug!("assembled {}", packet);
                            completed.push(packet);
                        }
                        Err(err) => warn!("dropping frame: {err}"),
                    }
                }
                self.clear();
            }
        }

        completed
    }
}
