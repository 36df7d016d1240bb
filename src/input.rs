//! Interaction routing: operator mode, surface clicks, teleop drive.
//!
//! Clicks mean different things per mode: a new station in mapping mode
//! (when a name is pending), a new waypoint in waypoints mode, a world-
//! frame navigation goal in navigation mode. Teleop ignores clicks and
//! synthesizes velocity commands from directional press/release instead.

use crate::config::TeleopConfig;
use crate::model::{MapModel, StationKind, WorldPoint};
use crate::render::transform::SurfaceMapping;

/// Active operator mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorMode {
    #[default]
    Teleop,
    Mapping,
    Waypoints,
    Navigation,
}

impl OperatorMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "teleop" => Some(Self::Teleop),
            "mapping" => Some(Self::Mapping),
            "waypoints" => Some(Self::Waypoints),
            "navigation" => Some(Self::Navigation),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Teleop => "teleop",
            Self::Mapping => "mapping",
            Self::Waypoints => "waypoints",
            Self::Navigation => "navigation",
        }
    }
}

/// Directional teleop control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveInput {
    Forward,
    Backward,
    Left,
    Right,
    /// Control released
    Stop,
}

impl DriveInput {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "forward" => Some(Self::Forward),
            "backward" => Some(Self::Backward),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    /// Velocity pair (linear m/s, angular rad/s) for this control
    pub fn velocity(&self, teleop: &TeleopConfig) -> (f32, f32) {
        match self {
            Self::Forward => (teleop.linear_speed, 0.0),
            Self::Backward => (-teleop.linear_speed, 0.0),
            Self::Left => (0.0, teleop.angular_speed),
            Self::Right => (0.0, -teleop.angular_speed),
            Self::Stop => (0.0, 0.0),
        }
    }
}

/// What a click did, for logging and feedback
#[derive(Debug, Clone, PartialEq)]
pub enum ClickAction {
    StationAdded { id: u32, name: String },
    WaypointAdded { id: u32, order: u32 },
    GoalSet { goal: WorldPoint },
    Ignored,
}

/// Routes surface clicks into map-model mutations by mode
#[derive(Debug, Default)]
pub struct InteractionRouter {
    mode: OperatorMode,
    pending_station_name: Option<String>,
}

impl InteractionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> OperatorMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: OperatorMode) {
        self.mode = mode;
    }

    /// Stage a name for the next station click in mapping mode
    pub fn set_pending_station_name(&mut self, name: impl Into<String>) {
        self.pending_station_name = Some(name.into());
    }

    pub fn pending_station_name(&self) -> Option<&str> {
        self.pending_station_name.as_deref()
    }

    /// Dispatch a surface click. `mapping` is the current surface mapping,
    /// absent while no grid has been received; navigation clicks need it
    /// for the inverse transform.
    pub fn handle_click(
        &mut self,
        px: f32,
        py: f32,
        model: &mut MapModel,
        mapping: Option<&SurfaceMapping>,
    ) -> ClickAction {
        match self.mode {
            OperatorMode::Teleop => ClickAction::Ignored,
            OperatorMode::Mapping => match self.pending_station_name.take() {
                Some(name) => {
                    let id = model.add_station(name.clone(), px, py, StationKind::Work);
                    ClickAction::StationAdded { id, name }
                }
                None => ClickAction::Ignored,
            },
            OperatorMode::Waypoints => {
                let id = model.add_waypoint(px, py);
                let order = model
                    .waypoints()
                    .iter()
                    .find(|w| w.id == id)
                    .map(|w| w.order)
                    .unwrap_or(0);
                ClickAction::WaypointAdded { id, order }
            }
            OperatorMode::Navigation => match mapping {
                Some(mapping) => {
                    let (wx, wy) = mapping.surface_to_world(px, py);
                    let goal = WorldPoint::new(wx, wy);
                    model.set_goal(goal);
                    ClickAction::GoalSet { goal }
                }
                None => ClickAction::Ignored,
            },
        }
    }
}
