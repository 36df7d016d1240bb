//! Transport layer for the bridge channel.
//!
//! The console only requires a small capability surface from the channel:
//! open, send, non-blocking poll, close. The real implementation speaks
//! length-prefixed JSON frames over TCP; the mock is channel-backed and
//! used by tests and offline demos.
//!
//! Wire format, per frame:
//!
//! ```text
//! ┌──────────────────┬─────────────────────┐
//! │ Length (4 bytes) │ JSON frame          │
//! │ Big-endian u32   │ {op, topic, msg}    │
//! └──────────────────┴─────────────────────┘
//! ```

use crate::error::{NetraError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Maximum accepted frame size (1MB)
const MAX_FRAME_LEN: usize = 1024 * 1024;

/// One message on the bridge channel
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BridgeFrame {
    /// "advertise", "subscribe", "unsubscribe" or "publish"
    pub op: String,
    pub topic: String,
    #[serde(default)]
    pub msg: serde_json::Value,
}

impl BridgeFrame {
    pub fn new(op: &str, topic: &str, msg: serde_json::Value) -> Self {
        Self {
            op: op.to_string(),
            topic: topic.to_string(),
            msg,
        }
    }
}

/// Lifecycle and data events delivered by a transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// The channel is open and usable
    Opened,
    /// An inbound topic message
    Message {
        topic: String,
        payload: serde_json::Value,
    },
    /// The transport reported an error; the channel is unusable
    Error(String),
    /// The channel was closed, orderly or not
    Closed,
}

/// Capability surface the console requires from the message channel
pub trait BridgeTransport {
    /// Open the channel to the given endpoint
    fn open(&mut self, url: &str) -> Result<()>;

    /// Send one frame
    fn send(&mut self, frame: &BridgeFrame) -> Result<()>;

    /// Poll for the next pending event without blocking
    fn poll(&mut self) -> Result<Option<TransportEvent>>;

    /// Close the channel
    fn close(&mut self);
}

/// TCP transport speaking length-prefixed JSON frames
pub struct TcpTransport {
    stream: Option<TcpStream>,
    connect_timeout: Duration,
    rx_buf: Vec<u8>,
    pending: VecDeque<TransportEvent>,
}

impl TcpTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self {
            stream: None,
            connect_timeout,
            rx_buf: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Drain complete frames out of the receive buffer into the event queue
    fn decode_buffered(&mut self) {
        loop {
            if self.rx_buf.len() < 4 {
                return;
            }
            let len = u32::from_be_bytes([
                self.rx_buf[0],
                self.rx_buf[1],
                self.rx_buf[2],
                self.rx_buf[3],
            ]) as usize;

            if len > MAX_FRAME_LEN {
                self.pending
                    .push_back(TransportEvent::Error(format!("Frame too large: {} bytes", len)));
                self.rx_buf.clear();
                return;
            }
            if self.rx_buf.len() < 4 + len {
                return;
            }

            match serde_json::from_slice::<BridgeFrame>(&self.rx_buf[4..4 + len]) {
                Ok(frame) => self.pending.push_back(TransportEvent::Message {
                    topic: frame.topic,
                    payload: frame.msg,
                }),
                Err(e) => {
                    // Unparseable frame: drop it, keep the channel alive
                    tracing::warn!("Dropping unparseable frame: {}", e);
                }
            }
            self.rx_buf.drain(..4 + len);
        }
    }
}

impl BridgeTransport for TcpTransport {
    fn open(&mut self, url: &str) -> Result<()> {
        let addr: std::net::SocketAddr = url
            .parse()
            .map_err(|e| NetraError::Config(format!("Invalid bridge address '{}': {}", url, e)))?;
        let stream = TcpStream::connect_timeout(&addr, self.connect_timeout)?;
        stream.set_write_timeout(Some(self.connect_timeout))?;
        stream.set_nonblocking(true)?;
        self.stream = Some(stream);
        self.rx_buf.clear();
        self.pending.push_back(TransportEvent::Opened);
        Ok(())
    }

    fn send(&mut self, frame: &BridgeFrame) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(NetraError::Closed)?;
        let encoded = serde_json::to_vec(frame)?;
        let len = encoded.len() as u32;
        stream.set_nonblocking(false)?;
        let written = stream
            .write_all(&len.to_be_bytes())
            .and_then(|_| stream.write_all(&encoded))
            .and_then(|_| stream.flush());
        // Restore non-blocking mode before reporting any write error, or
        // the next poll() would block the event loop
        let restored = stream.set_nonblocking(true);
        written?;
        restored?;
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<TransportEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };

        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk) {
                Ok(0) => {
                    self.stream = None;
                    return Ok(Some(TransportEvent::Closed));
                }
                Ok(n) => {
                    self.rx_buf.extend_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => {
                    self.stream = None;
                    return Ok(Some(TransportEvent::Error(e.to_string())));
                }
            }
        }

        self.decode_buffered();
        Ok(self.pending.pop_front())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
        self.pending.clear();
        self.rx_buf.clear();
    }
}

/// Mock transport for unit testing. Cloned handles share state, so a test
/// can inject events and inspect sent frames while the console owns the
/// boxed transport.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Default)]
struct MockInner {
    opened_url: Option<String>,
    events: VecDeque<TransportEvent>,
    sent: Vec<BridgeFrame>,
    fail_open: Option<String>,
    closed: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next open() fail with the given message
    pub fn fail_open(&self, message: &str) {
        self.inner.lock().unwrap().fail_open = Some(message.to_string());
    }

    /// Queue an event for the console to poll
    pub fn push_event(&self, event: TransportEvent) {
        self.inner.lock().unwrap().events.push_back(event);
    }

    /// URL passed to open(), if any
    pub fn opened_url(&self) -> Option<String> {
        self.inner.lock().unwrap().opened_url.clone()
    }

    /// All frames sent so far
    pub fn sent_frames(&self) -> Vec<BridgeFrame> {
        self.inner.lock().unwrap().sent.clone()
    }

    pub fn was_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }
}

impl BridgeTransport for MockTransport {
    fn open(&mut self, url: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(msg) = inner.fail_open.take() {
            return Err(NetraError::Protocol(msg));
        }
        inner.opened_url = Some(url.to_string());
        Ok(())
    }

    fn send(&mut self, frame: &BridgeFrame) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(NetraError::Closed);
        }
        inner.sent.push(frame.clone());
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<TransportEvent>> {
        Ok(self.inner.lock().unwrap().events.pop_front())
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        inner.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_records_sent_frames() {
        let mock = MockTransport::new();
        let mut boxed: Box<dyn BridgeTransport> = Box::new(mock.clone());
        boxed.open("127.0.0.1:9090").unwrap();
        boxed
            .send(&BridgeFrame::new("subscribe", "/odom", serde_json::Value::Null))
            .unwrap();
        assert_eq!(mock.opened_url().as_deref(), Some("127.0.0.1:9090"));
        let sent = mock.sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].op, "subscribe");
        assert_eq!(sent[0].topic, "/odom");
    }

    #[test]
    fn mock_delivers_events_in_order() {
        let mock = MockTransport::new();
        mock.push_event(TransportEvent::Opened);
        mock.push_event(TransportEvent::Closed);
        let mut boxed: Box<dyn BridgeTransport> = Box::new(mock.clone());
        assert!(matches!(boxed.poll().unwrap(), Some(TransportEvent::Opened)));
        assert!(matches!(boxed.poll().unwrap(), Some(TransportEvent::Closed)));
        assert!(boxed.poll().unwrap().is_none());
    }

    fn framed(frame: &BridgeFrame) -> Vec<u8> {
        let body = serde_json::to_vec(frame).unwrap();
        let mut bytes = (body.len() as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(&body);
        bytes
    }

    #[test]
    fn decoder_reassembles_partial_frames() {
        let mut transport = TcpTransport::new(Duration::from_millis(100));
        let bytes = framed(&BridgeFrame::new(
            "publish",
            "/odom",
            serde_json::json!({"seq": 1}),
        ));

        let (head, tail) = bytes.split_at(bytes.len() / 2);
        transport.rx_buf.extend_from_slice(head);
        transport.decode_buffered();
        assert!(transport.pending.is_empty());

        transport.rx_buf.extend_from_slice(tail);
        transport.decode_buffered();
        match transport.pending.pop_front() {
            Some(TransportEvent::Message { topic, payload }) => {
                assert_eq!(topic, "/odom");
                assert_eq!(payload["seq"], 1);
            }
            other => panic!("expected message, got {:?}", other),
        }
        assert!(transport.rx_buf.is_empty());
    }

    #[test]
    fn decoder_rejects_oversized_frames() {
        let mut transport = TcpTransport::new(Duration::from_millis(100));
        let len = (MAX_FRAME_LEN as u32 + 1).to_be_bytes();
        transport.rx_buf.extend_from_slice(&len);
        transport.rx_buf.extend_from_slice(b"xxxx");
        transport.decode_buffered();
        assert!(matches!(
            transport.pending.pop_front(),
            Some(TransportEvent::Error(_))
        ));
        assert!(transport.rx_buf.is_empty());
    }

    #[test]
    fn decoder_drops_garbage_frame_and_keeps_decoding() {
        let mut transport = TcpTransport::new(Duration::from_millis(100));
        let garbage = b"not json at all";
        transport
            .rx_buf
            .extend_from_slice(&(garbage.len() as u32).to_be_bytes());
        transport.rx_buf.extend_from_slice(garbage);
        transport.rx_buf.extend_from_slice(&framed(&BridgeFrame::new(
            "publish",
            "/map",
            serde_json::json!({"ok": true}),
        )));

        transport.decode_buffered();
        match transport.pending.pop_front() {
            Some(TransportEvent::Message { topic, .. }) => assert_eq!(topic, "/map"),
            other => panic!("expected message after dropped frame, got {:?}", other),
        }
        assert!(transport.pending.is_empty());
        assert!(transport.rx_buf.is_empty());
    }

    #[test]
    fn tcp_send_restores_nonblocking_mode() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut transport = TcpTransport::new(Duration::from_millis(500));
        transport.open(&addr.to_string()).unwrap();
        let _peer = listener.accept().unwrap();
        assert!(matches!(
            transport.poll().unwrap(),
            Some(TransportEvent::Opened)
        ));

        transport
            .send(&BridgeFrame::new("subscribe", "/odom", serde_json::Value::Null))
            .unwrap();
        // A stream left in blocking mode would hang this poll
        assert!(transport.poll().unwrap().is_none());
    }

    #[test]
    fn frame_roundtrips_through_json() {
        let frame = BridgeFrame::new(
            "publish",
            "/cmd_vel",
            serde_json::json!({"linear": {"x": 0.2}}),
        );
        let bytes = serde_json::to_vec(&frame).unwrap();
        let back: BridgeFrame = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back.op, "publish");
        assert_eq!(back.topic, "/cmd_vel");
        assert_eq!(back.msg["linear"]["x"], 0.2);
    }
}
