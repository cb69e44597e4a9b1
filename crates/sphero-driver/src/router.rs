//! Response routing and correlation.
//!
//! Decoded inbound packets are filed under their correlation key
//! `(device_id, command_id)`. For each key the table keeps only the most
//! recent undelivered packet: a new arrival before the previous one is
//! consumed replaces it. Consumers (blocking requests and subscription
//! workers) sleep on a condition variable that [`ResponseRouter::deliver`]
//! signals, so wakeups are immediate rather than poll-granular.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use log::debug;
use sphero_protocol::{CorrelationKey, Packet};

use crate::error::Error;

/// Result of waiting for a packet under a key.
#[derive(Debug, PartialEq)]
pub(crate) enum WaitOutcome {
    /// A matching packet arrived.
    Delivered(Packet),
    /// The deadline passed with nothing delivered.
    TimedOut,
    /// The session shut down while waiting.
    Closed,
}

#[derive(Default)]
struct RouterState {
    /// Most recent undelivered packet per key.
    slots: HashMap<CorrelationKey, Packet>,
    /// Cancellation flag per active subscription.
    subscriptions: HashMap<CorrelationKey, Arc<AtomicBool>>,
    /// Set once at shutdown; all waits fail fast afterwards.
    closed: bool,
}

/// Correlation table shared by the receiver thread, blocking requesters,
/// and subscription workers.
pub(crate) struct ResponseRouter {
    state: Mutex<RouterState>,
    wakeup: Condvar,
    /// Outbound sequence counter; wraps modulo 256. Session-owned, so
    /// separate connections never interfere.
    sequence: AtomicU8,
}

impl ResponseRouter {
    pub(crate) fn new() -> Self {
        ResponseRouter {
            state: Mutex::new(RouterState::default()),
            wakeup: Condvar::new(),
            sequence: AtomicU8::new(0),
        }
    }

    /// Next outbound sequence number. Starts at 0 so the first generated
    /// value is 1; atomic, so concurrent requesters never share a value.
    pub(crate) fn next_sequence(&self) -> u8 {
        self.sequence.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Whether the router has been shut down.
    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().expect("router lock poisoned").closed
    }

    /// File an inbound packet under its key and wake all waiters.
    pub(crate) fn deliver(&self, packet: Packet) {
        let mut state = self.state.lock().expect("router lock poisoned");
        if state.closed {
            return;
        }
        let key = packet.correlation_key();
        if state.slots.insert(key, packet).is_some() {
            debug!(
                "unconsumed packet for device 0x{:02X} command 0x{:02X} replaced",
                key.0, key.1
            );
        }
        drop(state);
        self.wakeup.notify_all();
    }

    /// Block until a packet for `key` is available, the timeout passes, or
    /// the router closes. The lock is released while sleeping.
    pub(crate) fn wait(&self, key: CorrelationKey, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().expect("router lock poisoned");
        loop {
            if state.closed {
                return WaitOutcome::Closed;
            }
            if let Some(packet) = state.slots.remove(&key) {
                return WaitOutcome::Delivered(packet);
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return WaitOutcome::TimedOut;
            };
            let (guard, _result) = self
                .wakeup
                .wait_timeout(state, remaining)
                .expect("router lock poisoned");
            state = guard;
        }
    }

    /// Register a subscription for `key`, returning its cancellation flag.
    pub(crate) fn register_subscription(
        &self,
        key: CorrelationKey,
    ) -> Result<Arc<AtomicBool>, Error> {
        let mut state = self.state.lock().expect("router lock poisoned");
        if state.closed {
            return Err(Error::Closed);
        }
        if state.subscriptions.contains_key(&key) {
            return Err(Error::DuplicateSubscription {
                device_id: key.0,
                command_id: key.1,
            });
        }
        let cancel = Arc::new(AtomicBool::new(false));
        state.subscriptions.insert(key, cancel.clone());
        Ok(cancel)
    }

    /// Cancel the subscription for `key`. Canceling an absent subscription
    /// is an error, not a no-op.
    pub(crate) fn cancel_subscription(&self, key: CorrelationKey) -> Result<(), Error> {
        let mut state = self.state.lock().expect("router lock poisoned");
        let Some(cancel) = state.subscriptions.remove(&key) else {
            return Err(Error::SubscriptionNotFound {
                device_id: key.0,
                command_id: key.1,
            });
        };
        cancel.store(true, Ordering::Relaxed);
        drop(state);
        // Wake the worker so it notices the flag promptly.
        self.wakeup.notify_all();
        Ok(())
    }

    /// Remove a subscription entry without treating absence as an error
    /// (used when a worker retires itself).
    pub(crate) fn forget_subscription(&self, key: CorrelationKey) {
        let mut state = self.state.lock().expect("router lock poisoned");
        if let Some(cancel) = state.subscriptions.remove(&key) {
            cancel.store(true, Ordering::Relaxed);
        }
    }

    /// Shut the router down: fail all waits, cancel all subscriptions.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock().expect("router lock poisoned");
        state.closed = true;
        for cancel in state.subscriptions.values() {
            cancel.store(true, Ordering::Relaxed);
        }
        state.subscriptions.clear();
        state.slots.clear();
        drop(state);
        self.wakeup.notify_all();
    }
}
