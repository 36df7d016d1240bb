//! Console runtime: the single-threaded event loop behind the operator UI.
//!
//! Everything here runs as reactions to discrete events: operator
//! commands, transport events, the connect deadline, and the render and
//! mirror schedules. Renders after grid updates are debounced; view
//! changes render on the next step. Rendering is pure, so a deferred
//! pass always uses the latest model snapshot.

use crate::bridge::manager::ConnectionManager;
use crate::bridge::transport::{BridgeTransport, TcpTransport};
use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::eventlog::EventLog;
use crate::input::{ClickAction, DriveInput, InteractionRouter, OperatorMode};
use crate::mirror::{MirrorPublisher, MirrorStore, StateSnapshot};
use crate::model::MapModel;
use crate::render::scene::{self, DrawCommand, SceneConfig};
use crate::render::svg;
use crate::render::transform::{SurfaceMapping, ViewTransform, Viewport};
use std::path::Path;
use std::time::{Duration, Instant};

/// Debounce window between a grid update and the render pass it schedules
const RENDER_DEBOUNCE: Duration = Duration::from_millis(80);

/// Cadence of mirror snapshot publishing
const MIRROR_INTERVAL: Duration = Duration::from_millis(250);

/// Parsed operator command line
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorCommand {
    Connect,
    Disconnect,
    Mode(OperatorMode),
    /// Stage a station name for the next mapping click
    Name(String),
    Click(f32, f32),
    ZoomIn,
    ZoomOut,
    Pan(f32, f32),
    ResetView,
    Drive(DriveInput),
    DeleteStation(u32),
    DeleteWaypoint(u32),
    ClearGoal,
    Patrol(Option<u32>),
    Status,
    Quit,
}

impl OperatorCommand {
    /// Parse one input line; returns None on anything unrecognized
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let head = parts.next()?;
        match head {
            "connect" => Some(Self::Connect),
            "disconnect" => Some(Self::Disconnect),
            "mode" => OperatorMode::parse(parts.next()?).map(Self::Mode),
            "name" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    None
                } else {
                    Some(Self::Name(name))
                }
            }
            "click" => {
                let x = parts.next()?.parse().ok()?;
                let y = parts.next()?.parse().ok()?;
                Some(Self::Click(x, y))
            }
            "zoom" => match parts.next()? {
                "in" => Some(Self::ZoomIn),
                "out" => Some(Self::ZoomOut),
                _ => None,
            },
            "pan" => {
                let dx = parts.next()?.parse().ok()?;
                let dy = parts.next()?.parse().ok()?;
                Some(Self::Pan(dx, dy))
            }
            "reset" => Some(Self::ResetView),
            "drive" => DriveInput::parse(parts.next()?).map(Self::Drive),
            "stop" => Some(Self::Drive(DriveInput::Stop)),
            "delete" => match parts.next()? {
                "station" => parts.next()?.parse().ok().map(Self::DeleteStation),
                "waypoint" => parts.next()?.parse().ok().map(Self::DeleteWaypoint),
                _ => None,
            },
            "clear-goal" => Some(Self::ClearGoal),
            "patrol" => match parts.next()? {
                "off" => Some(Self::Patrol(None)),
                id => id.parse().ok().map(|id| Self::Patrol(Some(id))),
            },
            "status" => Some(Self::Status),
            "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// The operator console runtime
pub struct Console<S: MirrorStore> {
    config: ConsoleConfig,
    manager: ConnectionManager,
    model: MapModel,
    view: ViewTransform,
    router: InteractionRouter,
    log: EventLog,
    scene_config: SceneConfig,
    viewport: Viewport,
    mirror: MirrorPublisher<S>,
    render_due: Option<Instant>,
    mirror_due: Option<Instant>,
}

impl<S: MirrorStore> Console<S> {
    pub fn new(config: ConsoleConfig, store: S) -> Self {
        let manager = ConnectionManager::new(
            config.topics.clone(),
            Duration::from_millis(config.connection.timeout_ms),
        );
        let viewport = Viewport::new(config.render.surface_width, config.render.surface_height);
        let scene_config = SceneConfig {
            sensor_range_m: config.render.sensor_range_m,
            ..SceneConfig::default()
        };
        Self {
            config,
            manager,
            model: MapModel::new(),
            view: ViewTransform::new(),
            router: InteractionRouter::new(),
            log: EventLog::new(),
            scene_config,
            viewport,
            mirror: MirrorPublisher::new(store),
            render_due: None,
            mirror_due: None,
        }
    }

    pub fn model(&self) -> &MapModel {
        &self.model
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    /// Whether connectivity-gated controls are currently enabled
    pub fn controls_enabled(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn request_render(&mut self, now: Instant) {
        match self.render_due {
            Some(due) if due <= now => {}
            _ => self.render_due = Some(now),
        }
    }

    /// Connect using the configured TCP transport
    pub fn connect(&mut self, now: Instant) {
        let transport = Box::new(TcpTransport::new(Duration::from_millis(
            self.config.connection.timeout_ms,
        )));
        self.connect_with(transport, now);
    }

    /// Connect over an externally supplied transport
    pub fn connect_with(&mut self, transport: Box<dyn BridgeTransport>, now: Instant) {
        let url = self.config.connection.bridge_url.clone();
        self.manager.connect(&url, transport, now, &mut self.log);
    }

    /// Apply one operator command. Returns false when the operator quit.
    pub fn handle_command(&mut self, command: OperatorCommand, now: Instant) -> bool {
        match command {
            OperatorCommand::Connect => self.connect(now),
            OperatorCommand::Disconnect => self.manager.disconnect(&mut self.log),
            OperatorCommand::Mode(mode) => {
                self.router.set_mode(mode);
                self.log.info(format!("Mode: {}", mode.name()));
            }
            OperatorCommand::Name(name) => {
                self.router.set_pending_station_name(name);
            }
            OperatorCommand::Click(x, y) => {
                let mapping = self
                    .model
                    .grid()
                    .map(|grid| SurfaceMapping::new(grid, &self.view, self.viewport));
                let action = self
                    .router
                    .handle_click(x, y, &mut self.model, mapping.as_ref());
                match action {
                    ClickAction::StationAdded { name, .. } => {
                        self.log.success(format!("Station '{}' added", name));
                    }
                    ClickAction::WaypointAdded { order, .. } => {
                        self.log.success(format!("Waypoint {} added", order));
                    }
                    ClickAction::GoalSet { goal } => {
                        self.log
                            .info(format!("Navigation goal set to ({:.2}, {:.2})", goal.x, goal.y));
                    }
                    ClickAction::Ignored => {}
                }
                self.request_render(now);
            }
            OperatorCommand::ZoomIn => {
                self.view.zoom_in();
                self.request_render(now);
            }
            OperatorCommand::ZoomOut => {
                self.view.zoom_out();
                self.request_render(now);
            }
            OperatorCommand::Pan(dx, dy) => {
                self.view.pan_by(dx, dy);
                self.request_render(now);
            }
            OperatorCommand::ResetView => {
                self.view.reset();
                self.request_render(now);
            }
            OperatorCommand::Drive(input) => {
                let (linear, angular) = input.velocity(&self.config.teleop);
                match self.manager.send_velocity(linear, angular) {
                    Ok(true) => {}
                    Ok(false) => self.log.warning("Movement controls disabled: not connected"),
                    Err(e) => self.log.error(format!("Velocity command failed: {}", e)),
                }
            }
            OperatorCommand::DeleteStation(id) => {
                if self.model.remove_station(id) {
                    self.log.info(format!("Station {} removed", id));
                }
                self.request_render(now);
            }
            OperatorCommand::DeleteWaypoint(id) => {
                if self.model.remove_waypoint(id) {
                    self.log.info(format!("Waypoint {} removed", id));
                }
                self.request_render(now);
            }
            OperatorCommand::ClearGoal => {
                self.model.clear_goal();
                self.log.info("Navigation goal cleared");
                self.request_render(now);
            }
            OperatorCommand::Patrol(target) => {
                self.model.set_patrol_target(target);
                self.request_render(now);
            }
            OperatorCommand::Status => {
                self.log.info(self.manager.status().to_string());
            }
            OperatorCommand::Quit => return false,
        }
        true
    }

    /// One pass of the event loop: pump transport events, fire the
    /// connect deadline, run due render and mirror passes.
    pub fn step(&mut self, now: Instant) {
        if self.manager.pump(&mut self.model, &mut self.log) {
            // Debounced: more grid messages may be right behind this one
            let due = now + RENDER_DEBOUNCE;
            match self.render_due {
                Some(existing) if existing <= due => {}
                _ => self.render_due = Some(due),
            }
        }
        self.manager.tick(now, &mut self.log);

        if self.render_due.is_some_and(|due| now >= due) {
            self.render_due = None;
            if let Err(e) = self.render_to_file() {
                tracing::warn!("Render failed: {}", e);
            }
        }

        if self.mirror_due.map_or(true, |due| now >= due) {
            self.mirror_due = Some(now + MIRROR_INTERVAL);
            if let Err(e) = self.publish_mirror() {
                tracing::warn!("Mirror publish failed: {}", e);
            }
        }
    }

    /// Produce the current draw-command list
    pub fn render_commands(&self) -> Vec<DrawCommand> {
        scene::render(&self.model, &self.view, self.viewport, &self.scene_config)
    }

    fn render_to_file(&self) -> Result<()> {
        let commands = self.render_commands();
        svg::save(&commands, self.viewport, Path::new(&self.config.render.view_path))
    }

    fn publish_mirror(&mut self) -> Result<()> {
        let snapshot = StateSnapshot::capture(
            &self.model,
            self.manager.is_connected(),
            self.manager.status(),
            self.router.mode().name(),
        );
        self.mirror.publish_state(&snapshot)?;
        self.mirror.publish_log(&self.log)?;
        Ok(())
    }
}
