//! Connection manager: the state machine over the bridge channel.
//!
//! Owns the connect/disconnect/error/timeout lifecycle. Each connect
//! attempt gets a monotonically increasing epoch; events from a previous
//! attempt are dropped on arrival, so a late message from a stale
//! connection can never resurrect dead state. Timeouts are deadlines
//! checked by `tick`, never blocking waits.
//!
//! Reconnection is manual: the operator re-issues connect. An automatic
//! retry policy would slot into the `Error`/`Closed` handling here.

use crate::bridge::client::{BridgeClient, BridgeEvent};
use crate::bridge::session::{RouteOutcome, TopicSession};
use crate::bridge::transport::{BridgeTransport, TransportEvent};
use crate::config::TopicConfig;
use crate::error::Result;
use crate::eventlog::EventLog;
use crate::model::MapModel;
use std::time::{Duration, Instant};

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No active attempt
    Idle,
    /// Attempt in flight, deadline armed
    Connecting,
    /// Channel open, topic session established
    Connected,
    /// Transport error or timeout
    Error,
    /// Channel closed
    Closed,
}

/// The connection state machine
pub struct ConnectionManager {
    state: ConnectionState,
    epoch: u64,
    url: String,
    timeout: Duration,
    deadline: Option<Instant>,
    status: String,
    topics: TopicConfig,
    client: Option<BridgeClient>,
    session: Option<TopicSession>,
}

impl ConnectionManager {
    pub fn new(topics: TopicConfig, timeout: Duration) -> Self {
        Self {
            state: ConnectionState::Idle,
            epoch: 0,
            url: String::new(),
            timeout,
            deadline: None,
            status: "Idle".to_string(),
            topics,
            client: None,
            session: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Human-readable status for the presentation layer
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Start a connect attempt. Returns false if suppressed because an
    /// attempt is already in flight.
    pub fn connect(
        &mut self,
        url: &str,
        transport: Box<dyn BridgeTransport>,
        now: Instant,
        log: &mut EventLog,
    ) -> bool {
        if self.state == ConnectionState::Connecting {
            log.warning("Connect ignored: attempt already in flight");
            return false;
        }

        // Invalidate everything tied to the previous epoch
        self.teardown();
        self.epoch += 1;
        self.url = url.to_string();

        match BridgeClient::open(self.epoch, transport, url) {
            Ok(client) => {
                self.client = Some(client);
                self.state = ConnectionState::Connecting;
                self.deadline = Some(now + self.timeout);
                self.status = format!("Connecting to {}...", url);
                log.info(format!("Connecting to {} (attempt {})", url, self.epoch));
            }
            Err(e) => {
                self.state = ConnectionState::Error;
                self.deadline = None;
                self.status = format!("Connection failed: {}", e);
                log.error(format!("Connection to {} failed: {}", url, e));
            }
        }
        true
    }

    /// Operator-initiated disconnect
    pub fn disconnect(&mut self, log: &mut EventLog) {
        self.teardown();
        self.state = ConnectionState::Idle;
        self.status = "Disconnected".to_string();
        log.info("Disconnected from bridge");
    }

    /// Fire the timeout if the deadline passed while still connecting
    pub fn tick(&mut self, now: Instant, log: &mut EventLog) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        if let Some(deadline) = self.deadline {
            if now >= deadline {
                self.teardown();
                self.state = ConnectionState::Error;
                self.status = format!(
                    "Connection attempt timed out after {}ms",
                    self.timeout.as_millis()
                );
                log.error(format!(
                    "Connection to {} timed out after {}ms",
                    self.url,
                    self.timeout.as_millis()
                ));
            }
        }
    }

    /// Drain all pending transport events. Returns true if the grid was
    /// replaced and a render pass should be scheduled.
    pub fn pump(&mut self, model: &mut MapModel, log: &mut EventLog) -> bool {
        let mut grid_updated = false;
        loop {
            let polled = match self.client.as_mut() {
                Some(client) => client.poll(),
                None => return grid_updated,
            };
            match polled {
                Ok(Some(event)) => {
                    if self.handle_event(event, model, log) == RouteOutcome::GridUpdated {
                        grid_updated = true;
                    }
                }
                Ok(None) => return grid_updated,
                Err(e) => {
                    self.teardown();
                    self.state = ConnectionState::Error;
                    self.status = format!("Transport error: {}", e);
                    log.error(format!("Transport error: {}", e));
                    return grid_updated;
                }
            }
        }
    }

    /// Apply one event to the state machine
    fn handle_event(
        &mut self,
        event: BridgeEvent,
        model: &mut MapModel,
        log: &mut EventLog,
    ) -> RouteOutcome {
        if event.epoch != self.epoch {
            tracing::debug!(
                "Dropping event from stale epoch {} (current {})",
                event.epoch,
                self.epoch
            );
            return RouteOutcome::None;
        }

        match event.event {
            TransportEvent::Opened => {
                if self.state == ConnectionState::Connected {
                    // Idempotence: never set up a second session
                    log.warning("Duplicate connection event ignored");
                    return RouteOutcome::None;
                }
                self.deadline = None;
                let client = match self.client.as_mut() {
                    Some(c) => c,
                    None => return RouteOutcome::None,
                };
                match TopicSession::establish(client, &self.topics) {
                    Ok(session) => {
                        self.session = Some(session);
                        self.state = ConnectionState::Connected;
                        self.status = format!("Connected to {}", self.url);
                        log.success(format!("Connected to {}", self.url));
                    }
                    Err(e) => {
                        self.teardown();
                        self.state = ConnectionState::Error;
                        self.status = format!("Topic setup failed: {}", e);
                        log.error(format!("Topic setup failed: {}", e));
                    }
                }
                RouteOutcome::None
            }
            TransportEvent::Message { topic, payload } => {
                if self.state != ConnectionState::Connected {
                    return RouteOutcome::None;
                }
                match self.session.as_ref() {
                    Some(session) => session.route(&topic, &payload, model, log),
                    None => RouteOutcome::None,
                }
            }
            TransportEvent::Error(e) => {
                self.teardown();
                self.state = ConnectionState::Error;
                self.status = format!("Transport error: {}", e);
                log.error(format!("Transport error: {}", e));
                RouteOutcome::None
            }
            TransportEvent::Closed => {
                self.teardown();
                self.state = ConnectionState::Closed;
                self.status = "Connection closed".to_string();
                log.warning("Connection closed by bridge");
                RouteOutcome::None
            }
        }
    }

    /// Publish a velocity command, gated on `Connected`. Returns true if
    /// the command was sent. A send failure tears the connection down to
    /// `Error` before the error is returned.
    pub fn send_velocity(&mut self, linear: f32, angular: f32) -> Result<bool> {
        if self.state != ConnectionState::Connected {
            return Ok(false);
        }
        let (Some(session), Some(client)) = (self.session.as_ref(), self.client.as_mut()) else {
            return Ok(false);
        };
        if let Err(e) = session.publish_velocity(client, linear, angular) {
            self.teardown();
            self.state = ConnectionState::Error;
            self.status = format!("Transport error: {}", e);
            return Err(e);
        }
        Ok(true)
    }

    /// Release the session and client of the current epoch so no stale
    /// handle can publish to a dead connection
    fn teardown(&mut self) {
        if let (Some(session), Some(client)) = (self.session.take(), self.client.as_mut()) {
            session.teardown(client);
        }
        if let Some(mut client) = self.client.take() {
            client.close();
        }
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::transport::MockTransport;
    use crate::config::TopicConfig;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(TopicConfig::default(), Duration::from_millis(12000))
    }

    fn session_frame_count(mock: &MockTransport) -> usize {
        mock.sent_frames()
            .iter()
            .filter(|f| f.op == "advertise" || f.op == "subscribe")
            .count()
    }

    #[test]
    fn open_event_before_deadline_connects_with_one_session() {
        let mut m = manager();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let mock = MockTransport::new();
        let now = Instant::now();

        assert!(m.connect("127.0.0.1:9090", Box::new(mock.clone()), now, &mut log));
        assert_eq!(m.state(), ConnectionState::Connecting);

        mock.push_event(TransportEvent::Opened);
        m.pump(&mut model, &mut log);
        assert_eq!(m.state(), ConnectionState::Connected);
        assert_eq!(session_frame_count(&mock), 3);
    }

    #[test]
    fn duplicate_open_event_does_not_resubscribe() {
        let mut m = manager();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let mock = MockTransport::new();
        m.connect("127.0.0.1:9090", Box::new(mock.clone()), Instant::now(), &mut log);
        mock.push_event(TransportEvent::Opened);
        mock.push_event(TransportEvent::Opened);
        m.pump(&mut model, &mut log);
        assert_eq!(m.state(), ConnectionState::Connected);
        assert_eq!(session_frame_count(&mock), 3);
    }

    #[test]
    fn deadline_fires_timeout_with_distinct_status() {
        let mut m = manager();
        let mut log = EventLog::new();
        let mock = MockTransport::new();
        let now = Instant::now();
        m.connect("127.0.0.1:9090", Box::new(mock), now, &mut log);

        // One millisecond short: still connecting
        m.tick(now + Duration::from_millis(11999), &mut log);
        assert_eq!(m.state(), ConnectionState::Connecting);

        m.tick(now + Duration::from_millis(12000), &mut log);
        assert_eq!(m.state(), ConnectionState::Error);
        assert!(m.status().contains("timed out"));

        // A subsequent connect is accepted, not suppressed
        let mock2 = MockTransport::new();
        assert!(m.connect("127.0.0.1:9090", Box::new(mock2), now, &mut log));
        assert_eq!(m.state(), ConnectionState::Connecting);
    }

    #[test]
    fn reentrant_connect_is_suppressed_while_connecting() {
        let mut m = manager();
        let mut log = EventLog::new();
        let now = Instant::now();
        m.connect("127.0.0.1:9090", Box::new(MockTransport::new()), now, &mut log);
        let epoch = m.epoch();
        assert!(!m.connect("127.0.0.1:9090", Box::new(MockTransport::new()), now, &mut log));
        assert_eq!(m.epoch(), epoch);
    }

    #[test]
    fn stale_epoch_events_are_dropped() {
        let mut m = manager();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        m.connect(
            "127.0.0.1:9090",
            Box::new(MockTransport::new()),
            Instant::now(),
            &mut log,
        );
        let stale = BridgeEvent {
            epoch: m.epoch() - 1,
            event: TransportEvent::Opened,
        };
        m.handle_event(stale, &mut model, &mut log);
        assert_eq!(m.state(), ConnectionState::Connecting);
    }

    #[test]
    fn transport_error_tears_down_to_error_state() {
        let mut m = manager();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let mock = MockTransport::new();
        m.connect("127.0.0.1:9090", Box::new(mock.clone()), Instant::now(), &mut log);
        mock.push_event(TransportEvent::Opened);
        mock.push_event(TransportEvent::Error("reset by peer".to_string()));
        m.pump(&mut model, &mut log);
        assert_eq!(m.state(), ConnectionState::Error);
        // Stale handle must not publish to the dead connection
        assert!(!m.send_velocity(0.2, 0.0).unwrap());
    }

    #[test]
    fn close_event_transitions_to_closed() {
        let mut m = manager();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let mock = MockTransport::new();
        m.connect("127.0.0.1:9090", Box::new(mock.clone()), Instant::now(), &mut log);
        mock.push_event(TransportEvent::Opened);
        mock.push_event(TransportEvent::Closed);
        m.pump(&mut model, &mut log);
        assert_eq!(m.state(), ConnectionState::Closed);
    }

    #[test]
    fn velocity_gated_until_connected() {
        let mut m = manager();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let mock = MockTransport::new();

        assert!(!m.send_velocity(0.2, 0.0).unwrap());

        m.connect("127.0.0.1:9090", Box::new(mock.clone()), Instant::now(), &mut log);
        assert!(!m.send_velocity(0.2, 0.0).unwrap());

        mock.push_event(TransportEvent::Opened);
        m.pump(&mut model, &mut log);
        assert!(m.send_velocity(0.2, 0.0).unwrap());

        let sent = mock.sent_frames();
        assert_eq!(sent.last().unwrap().op, "publish");
        assert_eq!(sent.last().unwrap().topic, "/cmd_vel");
    }

    #[test]
    fn send_failure_tears_down_to_error() {
        let mut m = manager();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let mock = MockTransport::new();
        m.connect("127.0.0.1:9090", Box::new(mock.clone()), Instant::now(), &mut log);
        mock.push_event(TransportEvent::Opened);
        m.pump(&mut model, &mut log);
        assert!(m.is_connected());

        // Kill the channel underneath the session
        let mut dead = mock.clone();
        BridgeTransport::close(&mut dead);

        assert!(m.send_velocity(0.2, 0.0).is_err());
        assert_eq!(m.state(), ConnectionState::Error);
        assert!(m.status().contains("Transport error"));
        // The stale handle is gone; further sends are gated off
        assert!(!m.send_velocity(0.2, 0.0).unwrap());
    }

    #[test]
    fn failed_open_reports_transport_error() {
        let mut m = manager();
        let mut log = EventLog::new();
        let mock = MockTransport::new();
        mock.fail_open("connection refused");
        m.connect("127.0.0.1:9090", Box::new(mock), Instant::now(), &mut log);
        assert_eq!(m.state(), ConnectionState::Error);
        assert!(m.status().contains("failed"));
    }

    #[test]
    fn messages_route_into_model_while_connected() {
        let mut m = manager();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let mock = MockTransport::new();
        m.connect("127.0.0.1:9090", Box::new(mock.clone()), Instant::now(), &mut log);
        mock.push_event(TransportEvent::Opened);
        mock.push_event(TransportEvent::Message {
            topic: "/map".to_string(),
            payload: serde_json::json!({
                "info": {
                    "width": 2, "height": 2, "resolution": 1.0,
                    "origin": {"position": {"x": 0.0, "y": 0.0}},
                },
                "data": [0, 0, 0, 100],
            }),
        });
        let grid_updated = m.pump(&mut model, &mut log);
        assert!(grid_updated);
        assert!(model.grid().is_some());
    }
}
