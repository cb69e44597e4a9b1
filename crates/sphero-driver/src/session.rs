//! Connection session.
//!
//! A [`SpheroSession`] owns one connected transport and everything that
//! runs over it: a receiver thread that reassembles the inbound byte
//! stream, the response router, and the outbound sequence counter.
//!
//! Request/response and notification subscriptions share one correlation
//! table keyed by `(device_id, command_id)`. The key does not include the
//! sequence number, so only one request per key may be in flight at a
//! time; pipelining two requests with the same key is ambiguous by
//! protocol design and is the caller's responsibility to avoid.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use sphero_protocol::{
    CorrelationKey, Packet, PacketCollector, ProtocolError, MAX_FRAME_SIZE,
};

use crate::error::{Error, Result};
use crate::router::{ResponseRouter, WaitOutcome};
use crate::transport::{Transport, TransportError};

/// How long the receiver thread blocks in one `recv` call. Bounds both
/// shutdown latency and the cost of an idle connection.
const RECEIVE_POLL: Duration = Duration::from_millis(50);

/// Default timeout for request/response calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Returned by notification callbacks to keep or stop the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyControl {
    /// Keep delivering packets.
    Continue,
    /// Retire the subscription.
    Stop,
}

/// One connected API v2 session.
pub struct SpheroSession {
    transport: Arc<dyn Transport>,
    router: Arc<ResponseRouter>,
    running: Arc<AtomicBool>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl SpheroSession {
    /// Start a session over a connected transport. Spawns the receiver
    /// thread immediately.
    pub fn start(transport: Arc<dyn Transport>) -> Arc<Self> {
        debug!("starting session");
        let router = Arc::new(ResponseRouter::new());
        let running = Arc::new(AtomicBool::new(true));

        let receiver = thread::spawn({
            let transport = transport.clone();
            let router = router.clone();
            let running = running.clone();
            move || receive_loop(&*transport, &router, &running)
        });

        Arc::new(SpheroSession {
            transport,
            router,
            running,
            receiver: Mutex::new(Some(receiver)),
        })
    }

    /// Send a command and, when it requests a response, block until the
    /// matching response arrives or `timeout` passes.
    ///
    /// Returns `Ok(None)` without waiting when the command's flags request
    /// no response at all. When `check_api_error` is set, a response with
    /// a non-success status becomes [`Error::Api`].
    pub fn send_request(
        &self,
        packet: Packet,
        check_api_error: bool,
        timeout: Duration,
    ) -> Result<Option<Packet>> {
        if self.router.is_closed() {
            return Err(Error::Closed);
        }

        let packet = packet.with_sequence(self.router.next_sequence());
        let frame = packet.encode();
        if frame.len() > MAX_FRAME_SIZE {
            return Err(Error::Protocol(ProtocolError::FrameTooLong {
                max: MAX_FRAME_SIZE,
                actual: frame.len(),
            }));
        }

        debug!("send {packet}");
        self.transport.write(&frame)?;

        if !packet.wants_response() {
            return Ok(None);
        }

        let key = packet.correlation_key();
        match self.router.wait(key, timeout) {
            WaitOutcome::Delivered(response) => {
                debug!("recv {response}");
                if check_api_error && !response.api_error().is_success() {
                    return Err(Error::Api(response.api_error()));
                }
                Ok(Some(response))
            }
            WaitOutcome::TimedOut => Err(Error::Timeout {
                device_id: key.0,
                command_id: key.1,
            }),
            WaitOutcome::Closed => Err(Error::Closed),
        }
    }

    /// Convenience wrapper: send with error checking and the default
    /// timeout.
    pub fn request(&self, packet: Packet) -> Result<Option<Packet>> {
        self.send_request(packet, true, DEFAULT_TIMEOUT)
    }

    /// Register `callback` for every inbound packet matching the
    /// template's correlation key, on a dedicated worker thread.
    ///
    /// The worker waits up to `timeout` per delivery; each matching packet
    /// is handed over as `Some(packet)` and each expired wait as `None`.
    /// The subscription ends when the callback returns
    /// [`NotifyControl::Stop`], when [`cancel_notify`] is called for the
    /// key, or when the session closes. At most one subscription per key
    /// may be active.
    ///
    /// [`cancel_notify`]: SpheroSession::cancel_notify
    pub fn start_notify<F>(&self, template: &Packet, timeout: Duration, mut callback: F) -> Result<()>
    where
        F: FnMut(Option<Packet>) -> NotifyControl + Send + 'static,
    {
        let key = template.correlation_key();
        let cancel = self.router.register_subscription(key)?;
        let router = self.router.clone();

        debug!(
            "subscribing to device 0x{:02X} command 0x{:02X}",
            key.0, key.1
        );

        // Detached on purpose: shutdown signals the worker instead of
        // joining it, so close never blocks on a slow callback.
        thread::spawn(move || {
            while !cancel.load(Ordering::Relaxed) {
                let delivered = match router.wait(key, timeout) {
                    WaitOutcome::Delivered(packet) => Some(packet),
                    WaitOutcome::TimedOut => None,
                    WaitOutcome::Closed => break,
                };
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                if callback(delivered) == NotifyControl::Stop {
                    router.forget_subscription(key);
                    break;
                }
            }
            debug!(
                "subscription for device 0x{:02X} command 0x{:02X} ended",
                key.0, key.1
            );
        });

        Ok(())
    }

    /// Stop the subscription for `key`. Canceling a key with no active
    /// subscription is an error.
    pub fn cancel_notify(&self, key: CorrelationKey) -> Result<()> {
        self.router.cancel_subscription(key)
    }

    /// Shut the session down: stop the receiver, fail pending waits,
    /// signal subscription workers, and close the transport.
    ///
    /// Workers are signaled, not joined; only the receiver thread is
    /// joined, and it wakes within one poll interval.
    pub fn close(&self) {
        if !self.running.swap(false, Ordering::Relaxed) {
            return;
        }
        debug!("closing session");
        self.router.close();
        self.transport.close();
        if let Some(receiver) = self.receiver.lock().expect("receiver lock poisoned").take() {
            if receiver.join().is_err() {
                warn!("receiver thread panicked");
            }
        }
    }
}

impl Drop for SpheroSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Receiver loop: pull chunks from the transport, reassemble, deliver.
///
/// Stream corruption is handled inside the collector (resynchronize and
/// log); only transport failure or shutdown ends the loop. When the loop
/// ends the router is closed so pending waits fail instead of hanging.
fn receive_loop(transport: &dyn Transport, router: &ResponseRouter, running: &AtomicBool) {
    debug!("receiver started");
    let mut collector = PacketCollector::new();

    while running.load(Ordering::Relaxed) {
        match transport.recv(RECEIVE_POLL) {
            Ok(Some(chunk)) => {
                for packet in collector.feed(&chunk) {
                    router.deliver(packet);
                }
            }
            Ok(None) => {}
            Err(TransportError::Closed) => break,
            Err(err) => {
                warn!("receive error: {err}");
                break;
            }
        }
    }

    router.close();
    debug!("receiver stopped");
}
