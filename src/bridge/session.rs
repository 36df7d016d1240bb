//! Topic session: the message contracts layered on one connection.
//!
//! Established once per successful connection. Declares the velocity
//! command topic outbound and the telemetry and map topics inbound, and
//! decodes inbound payloads into map-model writes. Malformed payloads are
//! dropped and logged; they never reach the render path.

use crate::bridge::client::BridgeClient;
use crate::config::TopicConfig;
use crate::error::Result;
use crate::eventlog::EventLog;
use crate::model::{MapModel, OccupancyGrid, Pose, WorldPoint};
use serde::Deserialize;

/// What a routed message changed, so the runtime can schedule work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Message was not for this session, or was dropped
    None,
    /// Pose/velocity updated
    PoseUpdated,
    /// Grid replaced; a render pass should be scheduled
    GridUpdated,
}

// Inbound telemetry: pose.pose.{position{x,y}, orientation{z,w}} and
// twist.twist.{linear.x, angular.z}.

#[derive(Deserialize)]
struct TelemetryMsg {
    pose: PoseOuter,
    twist: TwistOuter,
}

#[derive(Deserialize)]
struct PoseOuter {
    pose: PoseInner,
}

#[derive(Deserialize)]
struct PoseInner {
    position: Position,
    orientation: Orientation,
}

#[derive(Deserialize)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Deserialize)]
struct Orientation {
    z: f32,
    w: f32,
}

#[derive(Deserialize)]
struct TwistOuter {
    twist: TwistInner,
}

#[derive(Deserialize)]
struct TwistInner {
    linear: LinearVel,
    angular: AngularVel,
}

#[derive(Deserialize)]
struct LinearVel {
    x: f32,
}

#[derive(Deserialize)]
struct AngularVel {
    z: f32,
}

// Inbound map: info{width, height, resolution, origin.position{x,y}} + data.

#[derive(Deserialize)]
struct MapMsg {
    info: MapInfo,
    data: Vec<i8>,
}

#[derive(Deserialize)]
struct MapInfo {
    width: u32,
    height: u32,
    resolution: f32,
    origin: MapOrigin,
}

#[derive(Deserialize)]
struct MapOrigin {
    position: Position,
}

/// Decode a planar heading from the quaternion z/w pair, in degrees.
/// The raw value is passed through with no wrap normalization.
pub fn heading_degrees(z: f32, w: f32) -> f32 {
    (2.0 * z.atan2(w)).to_degrees()
}

/// Per-connection topic setup and message routing
pub struct TopicSession {
    topics: TopicConfig,
}

impl TopicSession {
    /// Declare all topics this console needs on a freshly opened connection
    pub fn establish(client: &mut BridgeClient, topics: &TopicConfig) -> Result<Self> {
        client.advertise(&topics.cmd_vel)?;
        client.subscribe(&topics.odom)?;
        client.subscribe(&topics.map)?;
        tracing::debug!(
            "Topic session established: out {}, in {} + {}",
            topics.cmd_vel,
            topics.odom,
            topics.map
        );
        Ok(Self {
            topics: topics.clone(),
        })
    }

    /// Release the inbound topics. The connection may already be dead, so
    /// send failures are ignored.
    pub fn teardown(&self, client: &mut BridgeClient) {
        let _ = client.unsubscribe(&self.topics.odom);
        let _ = client.unsubscribe(&self.topics.map);
    }

    /// Route one inbound message into the map model
    pub fn route(
        &self,
        topic: &str,
        payload: &serde_json::Value,
        model: &mut MapModel,
        log: &mut EventLog,
    ) -> RouteOutcome {
        if topic == self.topics.odom {
            match serde_json::from_value::<TelemetryMsg>(payload.clone()) {
                Ok(msg) => {
                    let theta =
                        heading_degrees(msg.pose.pose.orientation.z, msg.pose.pose.orientation.w);
                    model.set_pose(Pose::new(
                        msg.pose.pose.position.x,
                        msg.pose.pose.position.y,
                        theta,
                    ));
                    model.set_velocity(msg.twist.twist.linear.x, msg.twist.twist.angular.z);
                    RouteOutcome::PoseUpdated
                }
                Err(e) => {
                    log.warning(format!("Dropped malformed telemetry message: {}", e));
                    RouteOutcome::None
                }
            }
        } else if topic == self.topics.map {
            match serde_json::from_value::<MapMsg>(payload.clone()) {
                Ok(msg) => {
                    if msg.data.is_empty() {
                        // Empty payloads are explicitly not an error
                        tracing::debug!("Ignoring empty grid payload");
                        return RouteOutcome::None;
                    }
                    match OccupancyGrid::new(
                        msg.info.width,
                        msg.info.height,
                        msg.info.resolution,
                        WorldPoint::new(msg.info.origin.position.x, msg.info.origin.position.y),
                        msg.data,
                    ) {
                        Ok(grid) => {
                            model.set_grid(grid);
                            RouteOutcome::GridUpdated
                        }
                        Err(e) => {
                            log.warning(format!("Dropped invalid grid message: {}", e));
                            RouteOutcome::None
                        }
                    }
                }
                Err(e) => {
                    log.warning(format!("Dropped malformed map message: {}", e));
                    RouteOutcome::None
                }
            }
        } else {
            RouteOutcome::None
        }
    }

    /// Publish a velocity command. Only linear.x and angular.z are
    /// populated (differential-drive planar motion).
    pub fn publish_velocity(
        &self,
        client: &mut BridgeClient,
        linear: f32,
        angular: f32,
    ) -> Result<()> {
        client.publish(
            &self.topics.cmd_vel,
            serde_json::json!({
                "linear": {"x": linear, "y": 0.0, "z": 0.0},
                "angular": {"x": 0.0, "y": 0.0, "z": angular},
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::transport::MockTransport;

    fn session_with_mock() -> (TopicSession, BridgeClient, MockTransport) {
        let mock = MockTransport::new();
        let mut client =
            BridgeClient::open(1, Box::new(mock.clone()), "127.0.0.1:9090").unwrap();
        let session = TopicSession::establish(&mut client, &TopicConfig::default()).unwrap();
        (session, client, mock)
    }

    fn telemetry_json(x: f32, y: f32, z: f32, w: f32) -> serde_json::Value {
        serde_json::json!({
            "pose": {"pose": {
                "position": {"x": x, "y": y},
                "orientation": {"z": z, "w": w},
            }},
            "twist": {"twist": {
                "linear": {"x": 0.15},
                "angular": {"z": -0.3},
            }},
        })
    }

    #[test]
    fn establish_declares_all_three_topics() {
        let (_session, _client, mock) = session_with_mock();
        let sent = mock.sent_frames();
        assert_eq!(sent.len(), 3);
        assert_eq!((sent[0].op.as_str(), sent[0].topic.as_str()), ("advertise", "/cmd_vel"));
        assert_eq!((sent[1].op.as_str(), sent[1].topic.as_str()), ("subscribe", "/odom"));
        assert_eq!((sent[2].op.as_str(), sent[2].topic.as_str()), ("subscribe", "/map"));
    }

    #[test]
    fn identity_quaternion_decodes_to_zero_heading() {
        assert_eq!(heading_degrees(0.0, 1.0), 0.0);
    }

    #[test]
    fn quarter_turn_decodes_to_ninety_degrees() {
        // z = sin(45°), w = cos(45°) encodes a 90° planar rotation
        let s = std::f32::consts::FRAC_PI_4.sin();
        let c = std::f32::consts::FRAC_PI_4.cos();
        assert!((heading_degrees(s, c) - 90.0).abs() < 1e-3);
    }

    #[test]
    fn telemetry_updates_pose_and_velocity() {
        let (session, _client, _mock) = session_with_mock();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let outcome = session.route("/odom", &telemetry_json(2.0, 2.0, 0.0, 1.0), &mut model, &mut log);
        assert_eq!(outcome, RouteOutcome::PoseUpdated);
        let pose = model.pose();
        assert_eq!(pose.x, 2.0);
        assert_eq!(pose.y, 2.0);
        assert_eq!(pose.theta_deg, 0.0);
        assert_eq!(model.velocity(), (0.15, -0.3));
    }

    #[test]
    fn malformed_telemetry_is_dropped_and_logged() {
        let (session, _client, _mock) = session_with_mock();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let outcome = session.route(
            "/odom",
            &serde_json::json!({"pose": {"oops": true}}),
            &mut model,
            &mut log,
        );
        assert_eq!(outcome, RouteOutcome::None);
        assert_eq!(log.len(), 1);
        assert_eq!(model.pose(), Pose::default());
    }

    #[test]
    fn map_message_replaces_grid() {
        let (session, _client, _mock) = session_with_mock();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let payload = serde_json::json!({
            "info": {
                "width": 2, "height": 2, "resolution": 0.5,
                "origin": {"position": {"x": -1.0, "y": -1.0}},
            },
            "data": [-1, 10, 70, 50],
        });
        let outcome = session.route("/map", &payload, &mut model, &mut log);
        assert_eq!(outcome, RouteOutcome::GridUpdated);
        let grid = model.grid().unwrap();
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.resolution(), 0.5);
        assert_eq!(grid.origin(), WorldPoint::new(-1.0, -1.0));
        assert_eq!(grid.cell(1, 1), Some(50));
    }

    #[test]
    fn empty_grid_payload_is_ignored_not_an_error() {
        let (session, _client, _mock) = session_with_mock();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let payload = serde_json::json!({
            "info": {
                "width": 4, "height": 4, "resolution": 1.0,
                "origin": {"position": {"x": 0.0, "y": 0.0}},
            },
            "data": [],
        });
        let outcome = session.route("/map", &payload, &mut model, &mut log);
        assert_eq!(outcome, RouteOutcome::None);
        assert!(model.grid().is_none());
        assert!(log.is_empty());
    }

    #[test]
    fn wrong_length_grid_is_dropped_and_logged() {
        let (session, _client, _mock) = session_with_mock();
        let mut model = MapModel::new();
        let mut log = EventLog::new();
        let payload = serde_json::json!({
            "info": {
                "width": 4, "height": 4, "resolution": 1.0,
                "origin": {"position": {"x": 0.0, "y": 0.0}},
            },
            "data": [0, 0, 0],
        });
        let outcome = session.route("/map", &payload, &mut model, &mut log);
        assert_eq!(outcome, RouteOutcome::None);
        assert!(model.grid().is_none());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn velocity_command_populates_planar_fields_only() {
        let (session, mut client, mock) = session_with_mock();
        session.publish_velocity(&mut client, 0.2, -0.5).unwrap();
        let sent = mock.sent_frames();
        let cmd = &sent[sent.len() - 1];
        assert_eq!(cmd.op, "publish");
        assert_eq!(cmd.topic, "/cmd_vel");
        assert!((cmd.msg["linear"]["x"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert_eq!(cmd.msg["linear"]["y"], 0.0);
        assert!((cmd.msg["angular"]["z"].as_f64().unwrap() + 0.5).abs() < 1e-6);
        assert_eq!(cmd.msg["angular"]["x"], 0.0);
    }
}
