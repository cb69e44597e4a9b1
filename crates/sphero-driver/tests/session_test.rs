//! End-to-end session tests over an in-memory transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use sphero_driver::{
    Direction, Error, NotifyControl, Sphero, Transport, TransportError, MASK_ATTITUDE,
};
use sphero_protocol::{ApiError, Packet, FLAG_RESETS_INACTIVITY_TIMEOUT, FLAG_RESPONSE};

type Responder = Box<dyn Fn(&Packet) -> Vec<Packet> + Send + Sync>;

/// Channel-backed transport double. Captures outbound packets and can
/// answer them through a responder function; tests may also inject
/// arbitrary inbound chunks.
struct MockTransport {
    inbound_tx: Sender<Vec<u8>>,
    inbound_rx: Receiver<Vec<u8>>,
    sent: Mutex<Vec<Packet>>,
    responder: Option<Responder>,
    closed: AtomicBool,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Self::build(None)
    }

    fn with_responder<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&Packet) -> Vec<Packet> + Send + Sync + 'static,
    {
        Self::build(Some(Box::new(responder)))
    }

    /// Responder that acknowledges every request with an empty success
    /// response.
    fn acknowledging() -> Arc<Self> {
        Self::with_responder(|request| vec![respond(request, 0x00, &[])])
    }

    fn build(responder: Option<Responder>) -> Arc<Self> {
        let (inbound_tx, inbound_rx) = unbounded();
        Arc::new(MockTransport {
            inbound_tx,
            inbound_rx,
            sent: Mutex::new(Vec::new()),
            responder,
            closed: AtomicBool::new(false),
        })
    }

    fn inject_frame(&self, packet: &Packet) {
        self.inject(packet.encode());
    }

    fn inject(&self, chunk: Vec<u8>) {
        let _ = self.inbound_tx.send(chunk);
    }

    fn sent_packets(&self) -> Vec<Packet> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(TransportError::Closed);
        }
        let packet =
            Packet::decode(frame).map_err(|err| TransportError::Write(err.to_string()))?;
        let responses = self.responder.as_ref().map(|f| f(&packet));
        self.sent.lock().unwrap().push(packet);
        for response in responses.unwrap_or_default() {
            self.inject_frame(&response);
        }
        Ok(())
    }

    fn recv(&self, wait: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        match self.inbound_rx.recv_timeout(wait) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}

/// Build a response to `request` with the given status byte and data.
fn respond(request: &Packet, status: u8, data: &[u8]) -> Packet {
    let mut payload = vec![status];
    payload.extend_from_slice(data);
    Packet::command(request.device_id, request.command_id)
        .with_flags(FLAG_RESPONSE)
        .with_sequence(request.sequence)
        .with_payload(payload)
}

fn connect(mock: &Arc<MockTransport>) -> Sphero {
    Sphero::connect(mock.clone())
}

#[test]
fn test_request_response_roundtrip() {
    let mock = MockTransport::with_responder(|request| {
        // 0x0197 centivolts = 4.07 V
        vec![respond(request, 0x00, &[0x01, 0x97])]
    });
    let toy = connect(&mock);

    let voltage = toy.power().battery_voltage().unwrap();
    assert!((voltage - 4.07).abs() < 1e-3);
    toy.close();
}

#[test]
fn test_timeout_is_bounded() {
    let mock = MockTransport::new();
    let toy = connect(&mock);

    let started = Instant::now();
    let result =
        toy.session()
            .send_request(Packet::command(0x23, 0x42), true, Duration::from_millis(200));
    let elapsed = started.elapsed();

    assert!(matches!(
        result,
        Err(Error::Timeout {
            device_id: 0x23,
            command_id: 0x42
        })
    ));
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(1000), "took {elapsed:?}");
    toy.close();
}

#[test]
fn test_no_response_command_does_not_block() {
    let mock = MockTransport::new();
    let toy = connect(&mock);

    let started = Instant::now();
    let result = toy.session().send_request(
        Packet::command(0x23, 0x42).with_flags(FLAG_RESETS_INACTIVITY_TIMEOUT),
        true,
        Duration::from_secs(10),
    );

    assert!(matches!(result, Ok(None)));
    assert!(started.elapsed() < Duration::from_millis(100));
    toy.close();
}

#[test]
fn test_sequence_numbers_are_monotonic() {
    let mock = MockTransport::new();
    let toy = connect(&mock);

    for _ in 0..5 {
        toy.session()
            .send_request(
                Packet::command(0x23, 0x42).with_flags(FLAG_RESETS_INACTIVITY_TIMEOUT),
                true,
                Duration::from_secs(1),
            )
            .unwrap();
    }

    let sequences: Vec<u8> = mock.sent_packets().iter().map(|p| p.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    toy.close();
}

#[test]
fn test_concurrent_requests_keep_their_keys() {
    let mock = MockTransport::with_responder(|request| {
        let marker = match request.correlation_key() {
            (0x13, 0x03) => 0xAA,
            (0x16, 0x07) => 0xBB,
            _ => 0x00,
        };
        vec![respond(request, 0x00, &[marker])]
    });
    let toy = connect(&mock);

    let session_a = toy.session().clone();
    let a = thread::spawn(move || {
        session_a
            .send_request(Packet::command(0x13, 0x03), true, Duration::from_secs(5))
            .unwrap()
            .unwrap()
    });
    let session_b = toy.session().clone();
    let b = thread::spawn(move || {
        session_b
            .send_request(Packet::command(0x16, 0x07), true, Duration::from_secs(5))
            .unwrap()
            .unwrap()
    });

    assert_eq!(a.join().unwrap().payload, vec![0xAA]);
    assert_eq!(b.join().unwrap().payload, vec![0xBB]);
    toy.close();
}

#[test]
fn test_api_error_is_raised() {
    let mock = MockTransport::with_responder(|request| vec![respond(request, 0x07, &[])]);
    let toy = connect(&mock);

    let result = toy.session().request(Packet::command(0x16, 0x07));
    assert!(matches!(
        result,
        Err(Error::Api(ApiError::BadParameterValue))
    ));

    // With checking disabled the response comes through instead.
    let response = toy
        .session()
        .send_request(Packet::command(0x16, 0x07), false, Duration::from_secs(5))
        .unwrap()
        .unwrap();
    assert_eq!(response.api_error(), ApiError::BadParameterValue);
    toy.close();
}

#[test]
fn test_notify_stream_and_callback_stop() {
    let mock = MockTransport::new();
    let toy = connect(&mock);

    let (values_tx, values_rx) = unbounded();
    let template = Packet::command(0x18, 0x02);
    let mut seen = 0;
    toy.session()
        .start_notify(&template, Duration::from_secs(5), move |packet| {
            if let Some(packet) = packet {
                let _ = values_tx.send(packet.payload);
                seen += 1;
                if seen == 3 {
                    return NotifyControl::Stop;
                }
            }
            NotifyControl::Continue
        })
        .unwrap();

    // A second registration on the same key is refused while active.
    assert!(matches!(
        toy.session()
            .start_notify(&template, Duration::from_secs(5), |_| NotifyControl::Continue),
        Err(Error::DuplicateSubscription {
            device_id: 0x18,
            command_id: 0x02
        })
    ));

    for i in 0..3u8 {
        mock.inject_frame(
            &Packet::command(0x18, 0x02)
                .with_sequence(i)
                .with_payload(vec![i]),
        );
        // Space arrivals out so the single-slot buffer is drained between
        // deliveries.
        thread::sleep(Duration::from_millis(100));
    }

    for i in 0..3u8 {
        let payload = values_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("notification not delivered");
        assert_eq!(payload, vec![i]);
    }

    // The callback returned Stop, so the key is free again and cancel
    // reports the subscription as gone.
    thread::sleep(Duration::from_millis(100));
    assert!(matches!(
        toy.session().cancel_notify((0x18, 0x02)),
        Err(Error::SubscriptionNotFound { .. })
    ));
    toy.close();
}

#[test]
fn test_notify_reports_timeouts_to_callback() {
    let mock = MockTransport::new();
    let toy = connect(&mock);

    let (tx, rx) = unbounded();
    toy.session()
        .start_notify(
            &Packet::command(0x17, 0x11),
            Duration::from_millis(50),
            move |packet| {
                let _ = tx.send(packet.is_none());
                NotifyControl::Continue
            },
        )
        .unwrap();

    assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap());
    toy.session().cancel_notify((0x17, 0x11)).unwrap();
    toy.close();
}

#[test]
fn test_cancel_notify() {
    let mock = MockTransport::new();
    let toy = connect(&mock);

    toy.session()
        .start_notify(
            &Packet::command(0x18, 0x02),
            Duration::from_millis(50),
            |_| NotifyControl::Continue,
        )
        .unwrap();

    toy.session().cancel_notify((0x18, 0x02)).unwrap();
    assert!(matches!(
        toy.session().cancel_notify((0x18, 0x02)),
        Err(Error::SubscriptionNotFound {
            device_id: 0x18,
            command_id: 0x02
        })
    ));
    toy.close();
}

#[test]
fn test_drive_with_heading_layout() {
    let mock = MockTransport::acknowledging();
    let toy = connect(&mock);

    toy.driving()
        .drive_with_heading(255, 270, Direction::Forward)
        .unwrap();

    let sent = mock.sent_packets();
    assert_eq!(sent.len(), 1);
    let packet = &sent[0];
    assert_eq!(packet.device_id, 0x16);
    assert_eq!(packet.command_id, 0x07);
    assert_eq!(packet.target_id, Some(0x12));
    assert_eq!(packet.payload, vec![0xFF, 0x01, 0x0E, 0x00]);
    toy.close();
}

#[test]
fn test_set_all_leds_layout() {
    let mock = MockTransport::acknowledging();
    let toy = connect(&mock);

    toy.user_io().set_all_leds((1, 2, 3), (4, 5, 6)).unwrap();

    let sent = mock.sent_packets();
    assert_eq!(sent.len(), 1);
    let packet = &sent[0];
    assert_eq!(packet.device_id, 0x1A);
    assert_eq!(packet.command_id, 0x1C);
    assert_eq!(packet.target_id, Some(0x11));
    assert_eq!(packet.payload, vec![0x3F, 1, 2, 3, 4, 5, 6]);
    toy.close();
}

#[test]
fn test_sensor_streaming() {
    let mock = MockTransport::acknowledging();
    let toy = connect(&mock);

    let (values_tx, values_rx) = unbounded();
    toy.sensor()
        .start_streaming(MASK_ATTITUDE, 100, 0, Duration::from_secs(5), move |values| {
            if let Some(values) = values {
                let _ = values_tx.send(values);
            }
            NotifyControl::Continue
        })
        .unwrap();

    // The mask command goes out after the subscription is registered.
    let sent = mock.sent_packets();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].device_id, 0x18);
    assert_eq!(sent[0].command_id, 0x00);
    assert_eq!(
        sent[0].payload,
        vec![0x00, 0x64, 0x00, 0x00, 0x07, 0x00, 0x00]
    );

    // Streamed samples are plain notifications, not responses.
    let mut payload = Vec::new();
    payload.extend_from_slice(&10.5f32.to_be_bytes());
    payload.extend_from_slice(&(-3.25f32).to_be_bytes());
    payload.extend_from_slice(&179.0f32.to_be_bytes());
    mock.inject_frame(
        &Packet::command(0x18, 0x02)
            .with_flags(0x00)
            .with_sequence(0x00)
            .with_payload(payload),
    );

    let values = values_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert_eq!(values, vec![10.5, -3.25, 179.0]);

    toy.sensor().stop_streaming().unwrap();
    toy.close();
}

#[test]
fn test_failed_streaming_start_releases_subscription() {
    // The toy refuses the mask command.
    let mock = MockTransport::with_responder(|request| vec![respond(request, 0x08, &[])]);
    let toy = connect(&mock);

    let start = |toy: &Sphero| {
        toy.sensor().start_streaming(
            MASK_ATTITUDE,
            100,
            0,
            Duration::from_secs(5),
            |_| NotifyControl::Continue,
        )
    };

    assert!(matches!(start(&toy), Err(Error::Api(ApiError::Busy))));

    // The failed start left nothing behind: a retry reaches the toy again
    // instead of being refused as a duplicate, and there is no
    // subscription to cancel.
    assert!(matches!(start(&toy), Err(Error::Api(ApiError::Busy))));
    assert!(matches!(
        toy.sensor().stop_streaming(),
        Err(Error::SubscriptionNotFound { .. })
    ));
    toy.close();
}

#[test]
fn test_close_fails_pending_request() {
    let mock = MockTransport::new();
    let toy = connect(&mock);

    let session = toy.session().clone();
    let pending = thread::spawn(move || {
        session.send_request(Packet::command(0x23, 0x42), true, Duration::from_secs(30))
    });

    thread::sleep(Duration::from_millis(100));
    toy.close();

    assert!(matches!(pending.join().unwrap(), Err(Error::Closed)));
    assert!(matches!(
        toy.session().request(Packet::command(0x23, 0x42)),
        Err(Error::Closed)
    ));
}

#[test]
fn test_response_split_across_chunks() {
    let mock = MockTransport::new();
    let toy = connect(&mock);

    let session = toy.session().clone();
    let pending = thread::spawn(move || {
        session
            .send_request(Packet::command(0x11, 0x00), true, Duration::from_secs(5))
            .unwrap()
            .unwrap()
    });

    thread::sleep(Duration::from_millis(100));
    let request = &mock.sent_packets()[0];
    let frame = respond(request, 0x00, &[0x00, 0x06, 0x00, 0x02, 0x01, 0x44]).encode();
    // Deliver the frame one byte at a time, as a BLE stack is free to do.
    for b in frame {
        mock.inject(vec![b]);
    }

    let response = pending.join().unwrap();
    assert_eq!(response.payload, vec![0x00, 0x06, 0x00, 0x02, 0x01, 0x44]);
    toy.close();
}
