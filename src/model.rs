//! Map model: the single shared mutable structure of the console.
//!
//! Owns the latest occupancy grid, robot pose, goal, stations and waypoints.
//! Telemetry ingestion writes pose/grid, operator actions write stations,
//! waypoints and the goal. The renderer only reads.

use serde::{Deserialize, Serialize};

/// World-frame point (meters)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
}

impl WorldPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Robot pose in world frame. Heading is degrees, stored as received
/// from telemetry with no wrap normalization.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    pub theta_deg: f32,
}

impl Pose {
    pub const fn new(x: f32, y: f32, theta_deg: f32) -> Self {
        Self { x, y, theta_deg }
    }
}

/// Occupancy classification of a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    Unknown,
    Free,
    Occupied,
    Uncertain,
}

/// Classify a raw occupancy value: negative unknown, <25 free, >=65
/// occupied. The nominal unknown marker is -1; any other negative is
/// outside the occupancy domain and treated the same way rather than
/// falling into the free bucket.
pub fn classify_cell(value: i8) -> CellClass {
    match value {
        v if v < 0 => CellClass::Unknown,
        v if v < 25 => CellClass::Free,
        v if v >= 65 => CellClass::Occupied,
        _ => CellClass::Uncertain,
    }
}

/// Occupancy grid received from the map topic. Immutable once built;
/// each map message replaces the whole grid.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    resolution: f32,
    origin: WorldPoint,
    cells: Vec<i8>,
}

impl OccupancyGrid {
    /// Build a grid, validating dimensions against the cell payload.
    pub fn new(
        width: u32,
        height: u32,
        resolution: f32,
        origin: WorldPoint,
        cells: Vec<i8>,
    ) -> crate::error::Result<Self> {
        if width == 0 || height == 0 {
            return Err(crate::error::NetraError::Protocol(format!(
                "Invalid grid dimensions: {}x{}",
                width, height
            )));
        }
        if resolution <= 0.0 {
            return Err(crate::error::NetraError::Protocol(format!(
                "Invalid grid resolution: {}",
                resolution
            )));
        }
        let expected = width as usize * height as usize;
        if cells.len() != expected {
            return Err(crate::error::NetraError::Protocol(format!(
                "Grid data length {} does not match {}x{}",
                cells.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            resolution,
            origin,
            cells,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Meters per cell
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// World-frame position of grid cell (0, 0)
    pub fn origin(&self) -> WorldPoint {
        self.origin
    }

    /// Raw cell value at (gx, gy), row-major
    pub fn cell(&self, gx: u32, gy: u32) -> Option<i8> {
        if gx >= self.width || gy >= self.height {
            return None;
        }
        Some(self.cells[gy as usize * self.width as usize + gx as usize])
    }

    pub fn cells(&self) -> &[i8] {
        &self.cells
    }
}

/// Station kind, chosen at creation
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationKind {
    Charging,
    Work,
}

/// Tagged map location. Position is surface-space at creation time.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Station {
    pub id: u32,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub kind: StationKind,
}

/// Patrol route point. Position is surface-space; `order` is assigned at
/// creation and never renumbered, so deletions leave gaps.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Waypoint {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub order: u32,
}

/// The console's map model. All mutation goes through these methods.
#[derive(Debug, Default)]
pub struct MapModel {
    pose: Pose,
    linear_vel: f32,
    angular_vel: f32,
    grid: Option<OccupancyGrid>,
    stations: Vec<Station>,
    waypoints: Vec<Waypoint>,
    goal: Option<WorldPoint>,
    /// Waypoint id the patrol logic is currently driving toward
    patrol_target: Option<u32>,
    next_station_id: u32,
    next_waypoint_id: u32,
}

impl MapModel {
    pub fn new() -> Self {
        Self::default()
    }

    // --- telemetry writer path ---

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    pub fn set_velocity(&mut self, linear: f32, angular: f32) {
        self.linear_vel = linear;
        self.angular_vel = angular;
    }

    /// Replace the grid wholesale with a newly received one.
    pub fn set_grid(&mut self, grid: OccupancyGrid) {
        self.grid = Some(grid);
    }

    // --- operator writer path ---

    pub fn add_station(&mut self, name: impl Into<String>, x: f32, y: f32, kind: StationKind) -> u32 {
        self.next_station_id += 1;
        let id = self.next_station_id;
        self.stations.push(Station {
            id,
            name: name.into(),
            x,
            y,
            kind,
        });
        id
    }

    pub fn remove_station(&mut self, id: u32) -> bool {
        let before = self.stations.len();
        self.stations.retain(|s| s.id != id);
        self.stations.len() != before
    }

    /// Append a waypoint. Order is the current count plus one; existing
    /// orders are never changed afterwards.
    pub fn add_waypoint(&mut self, x: f32, y: f32) -> u32 {
        self.next_waypoint_id += 1;
        let id = self.next_waypoint_id;
        let order = self.waypoints.len() as u32 + 1;
        self.waypoints.push(Waypoint { id, x, y, order });
        id
    }

    pub fn remove_waypoint(&mut self, id: u32) -> bool {
        let before = self.waypoints.len();
        self.waypoints.retain(|w| w.id != id);
        if self.patrol_target == Some(id) {
            self.patrol_target = None;
        }
        self.waypoints.len() != before
    }

    pub fn set_goal(&mut self, goal: WorldPoint) {
        self.goal = Some(goal);
    }

    pub fn clear_goal(&mut self) {
        self.goal = None;
    }

    pub fn set_patrol_target(&mut self, waypoint_id: Option<u32>) {
        self.patrol_target = waypoint_id;
    }

    // --- readers ---

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.linear_vel, self.angular_vel)
    }

    pub fn grid(&self) -> Option<&OccupancyGrid> {
        self.grid.as_ref()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Waypoints sorted by patrol order
    pub fn waypoints_in_order(&self) -> Vec<&Waypoint> {
        let mut sorted: Vec<&Waypoint> = self.waypoints.iter().collect();
        sorted.sort_by_key(|w| w.order);
        sorted
    }

    pub fn goal(&self) -> Option<WorldPoint> {
        self.goal
    }

    pub fn patrol_target(&self) -> Option<u32> {
        self.patrol_target
    }
}
