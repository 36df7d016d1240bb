//! Scene composition: map model + view transform -> draw commands.
//!
//! `render` is a pure function; repeated calls with unchanged inputs
//! produce identical command lists. The painting order is fixed, back to
//! front: background, grid cells, stations, waypoint path, waypoints,
//! robot, goal. Layers whose data is absent are skipped.

use crate::model::{classify_cell, CellClass, MapModel, StationKind};
use crate::render::transform::{SurfaceMapping, ViewTransform, Viewport};

/// Color scheme for the rendered view
#[derive(Clone, Debug)]
pub struct Palette {
    pub background: &'static str,
    pub free: &'static str,
    pub occupied: &'static str,
    pub uncertain: &'static str,
    pub station_charging: &'static str,
    pub station_work: &'static str,
    pub waypoint: &'static str,
    pub waypoint_active: &'static str,
    pub patrol_path: &'static str,
    pub robot: &'static str,
    pub heading: &'static str,
    pub sensor_ring: &'static str,
    pub goal: &'static str,
    pub text: &'static str,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: "#1B1B24",
            free: "#FFFFFF",
            occupied: "#000000",
            uncertain: "#808080",
            station_charging: "#22AA22",
            station_work: "#FF8800",
            waypoint: "#4488FF",
            waypoint_active: "#FFD700",
            patrol_path: "#4488FF",
            robot: "#DD2222",
            heading: "#DD2222",
            sensor_ring: "#DD8888",
            goal: "#AA22AA",
            text: "#AAAAAA",
        }
    }
}

/// Scene parameters independent of the map model
#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub palette: Palette,
    /// Sensor range ring radius in meters
    pub sensor_range_m: f32,
    /// Robot marker radius in pixels at zoom 1
    pub robot_radius_px: f32,
    /// Heading ray length in pixels at zoom 1
    pub heading_ray_px: f32,
    /// Station/waypoint/goal marker radius in pixels
    pub marker_radius_px: f32,
    /// Cull margin around the surface in pixels
    pub cull_margin_px: f32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            palette: Palette::default(),
            sensor_range_m: 3.5,
            robot_radius_px: 8.0,
            heading_ray_px: 18.0,
            marker_radius_px: 6.0,
            cull_margin_px: 24.0,
        }
    }
}

/// Backend-independent draw command, in paint order
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear {
        color: &'static str,
    },
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: &'static str,
    },
    /// Filled circle
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        color: &'static str,
    },
    /// Stroked circle outline
    Ring {
        cx: f32,
        cy: f32,
        r: f32,
        width: f32,
        color: &'static str,
        dashed: bool,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        color: &'static str,
    },
    Polyline {
        points: Vec<(f32, f32)>,
        width: f32,
        color: &'static str,
        dashed: bool,
        closed: bool,
    },
    Text {
        x: f32,
        y: f32,
        size: f32,
        color: &'static str,
        content: String,
    },
}

fn rect_on_surface(x: f32, y: f32, w: f32, h: f32, viewport: Viewport, margin: f32) -> bool {
    x + w >= -margin
        && x <= viewport.width + margin
        && y + h >= -margin
        && y <= viewport.height + margin
}

fn circle_on_surface(cx: f32, cy: f32, r: f32, viewport: Viewport, margin: f32) -> bool {
    rect_on_surface(cx - r, cy - r, 2.0 * r, 2.0 * r, viewport, margin)
}

/// Render the model into an ordered draw-command list
pub fn render(
    model: &MapModel,
    view: &ViewTransform,
    viewport: Viewport,
    cfg: &SceneConfig,
) -> Vec<DrawCommand> {
    let mut commands = vec![DrawCommand::Clear {
        color: cfg.palette.background,
    }];

    let Some(grid) = model.grid() else {
        commands.push(DrawCommand::Text {
            x: viewport.width / 2.0,
            y: viewport.height / 2.0,
            size: 16.0,
            color: cfg.palette.text,
            content: "Waiting for map data...".to_string(),
        });
        return commands;
    };

    let mapping = SurfaceMapping::new(grid, view, viewport);
    let scale = mapping.scale();
    let margin = cfg.cull_margin_px;

    // Grid cells, with stepped sampling when cells are subpixel
    let step = if scale >= 1.0 {
        1
    } else {
        (1.0 / scale).ceil() as u32
    };
    let cell_px = scale * step as f32;
    let mut gy = 0;
    while gy < grid.height() {
        let mut gx = 0;
        while gx < grid.width() {
            if let Some(value) = grid.cell(gx, gy) {
                let color = match classify_cell(value) {
                    CellClass::Unknown => None,
                    CellClass::Free => Some(cfg.palette.free),
                    CellClass::Occupied => Some(cfg.palette.occupied),
                    CellClass::Uncertain => Some(cfg.palette.uncertain),
                };
                if let Some(color) = color {
                    let (x, y) = mapping.grid_to_surface(gx as f32, gy as f32);
                    if rect_on_surface(x, y, cell_px, cell_px, viewport, margin) {
                        commands.push(DrawCommand::Rect {
                            x,
                            y,
                            w: cell_px,
                            h: cell_px,
                            color,
                        });
                    }
                }
            }
            gx += step;
        }
        gy += step;
    }

    // Stations (surface-space positions)
    for station in model.stations() {
        if !circle_on_surface(station.x, station.y, cfg.marker_radius_px, viewport, margin) {
            continue;
        }
        let color = match station.kind {
            StationKind::Charging => cfg.palette.station_charging,
            StationKind::Work => cfg.palette.station_work,
        };
        commands.push(DrawCommand::Circle {
            cx: station.x,
            cy: station.y,
            r: cfg.marker_radius_px,
            color,
        });
    }

    // Patrol route: closed dashed polyline through waypoints in order
    let ordered = model.waypoints_in_order();
    if ordered.len() >= 2 {
        commands.push(DrawCommand::Polyline {
            points: ordered.iter().map(|w| (w.x, w.y)).collect(),
            width: 1.5,
            color: cfg.palette.patrol_path,
            dashed: true,
            closed: true,
        });
    }

    // Waypoints, active patrol target highlighted
    for waypoint in &ordered {
        if !circle_on_surface(waypoint.x, waypoint.y, cfg.marker_radius_px, viewport, margin) {
            continue;
        }
        let color = if model.patrol_target() == Some(waypoint.id) {
            cfg.palette.waypoint_active
        } else {
            cfg.palette.waypoint
        };
        commands.push(DrawCommand::Circle {
            cx: waypoint.x,
            cy: waypoint.y,
            r: cfg.marker_radius_px,
            color,
        });
    }

    // Robot marker: body, heading ray, sensor ring, all scaled by zoom.
    // Body and ring are culled by their own extents so a robot straddling
    // the surface edge stays partially visible.
    let pose = model.pose();
    let (rx, ry) = mapping.world_to_surface(pose.x, pose.y);
    let zoom = view.zoom();
    let body_extent = cfg.robot_radius_px.max(cfg.heading_ray_px) * zoom;
    if circle_on_surface(rx, ry, body_extent, viewport, margin) {
        commands.push(DrawCommand::Circle {
            cx: rx,
            cy: ry,
            r: cfg.robot_radius_px * zoom,
            color: cfg.palette.robot,
        });
        let theta = pose.theta_deg.to_radians();
        let ray = cfg.heading_ray_px * zoom;
        commands.push(DrawCommand::Line {
            x1: rx,
            y1: ry,
            // Surface Y grows downward, world theta is counterclockwise
            x2: rx + ray * theta.cos(),
            y2: ry - ray * theta.sin(),
            width: 2.0,
            color: cfg.palette.heading,
        });
    }
    let ring_r = cfg.sensor_range_m / grid.resolution() * scale;
    if circle_on_surface(rx, ry, ring_r, viewport, margin) {
        commands.push(DrawCommand::Ring {
            cx: rx,
            cy: ry,
            r: ring_r,
            width: 1.0,
            color: cfg.palette.sensor_ring,
            dashed: true,
        });
    }

    // Goal marker
    if let Some(goal) = model.goal() {
        let (gx, gy) = mapping.world_to_surface(goal.x, goal.y);
        if circle_on_surface(gx, gy, cfg.marker_radius_px, viewport, margin) {
            commands.push(DrawCommand::Circle {
                cx: gx,
                cy: gy,
                r: cfg.marker_radius_px,
                color: cfg.palette.goal,
            });
        }
    }

    commands
}
