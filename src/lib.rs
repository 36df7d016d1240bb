//! # NetraConsole
//!
//! Operator console library for a mobile robot speaking a JSON topic
//! bridge. The crate is built around three pillars:
//!
//! - **Bridge stack** ([`bridge`]): epoch-tagged connection lifecycle
//!   over a length-prefixed TCP channel, with topic sessions routing
//!   telemetry and occupancy grids into the map model.
//! - **Spatial view** ([`render`]): pure transform math (zoom, pan,
//!   world/grid/surface conversions) and a renderer that emits backend-
//!   agnostic draw commands, with an SVG adapter.
//! - **Operator surface** ([`console`], [`input`]): a single-threaded
//!   runtime reacting to parsed operator commands, plus a state mirror
//!   ([`mirror`]) for the decoupled monitor view.
//!
//! ## Example
//!
//! ```no_run
//! use netra_console::config::ConsoleConfig;
//! use netra_console::console::{Console, OperatorCommand};
//! use netra_console::mirror::MemoryStore;
//! use std::time::Instant;
//!
//! let mut console = Console::new(ConsoleConfig::default(), MemoryStore::new());
//! console.handle_command(OperatorCommand::Connect, Instant::now());
//! console.step(Instant::now());
//! ```

pub mod bridge;
pub mod config;
pub mod console;
pub mod error;
pub mod eventlog;
pub mod input;
pub mod mirror;
pub mod model;
pub mod render;

pub use config::ConsoleConfig;
pub use console::{Console, OperatorCommand};
pub use error::{NetraError, Result};
pub use eventlog::{EventLog, LogEntry, Severity};
pub use model::{MapModel, OccupancyGrid, Pose, WorldPoint};
