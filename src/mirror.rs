//! Cross-view state mirror.
//!
//! A last-write-wins key/value boundary between the console and a
//! decoupled monitor view. Three keys: the latest robot-state snapshot,
//! the full event log, and the single most recent log entry for
//! low-latency append. The monitor polls the store and must tolerate
//! missing or malformed entries; the console only needs "publish
//! snapshot" here and the monitor only needs "read snapshot".

use crate::error::{NetraError, Result};
use crate::eventlog::{EventLog, LogEntry};
use crate::model::{MapModel, Pose, WorldPoint};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const KEY_ROBOT_STATE: &str = "robot_state";
pub const KEY_EVENT_LOG: &str = "event_log";
pub const KEY_LAST_LOG_ENTRY: &str = "last_log_entry";

/// Full robot-state snapshot mirrored for the monitor view
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StateSnapshot {
    /// Timestamp in microseconds since epoch
    pub timestamp_us: u64,
    pub connected: bool,
    pub status: String,
    pub mode: String,
    pub pose: Pose,
    pub linear_vel: f32,
    pub angular_vel: f32,
    pub goal: Option<WorldPoint>,
    pub station_count: usize,
    pub waypoint_count: usize,
    pub has_grid: bool,
}

impl StateSnapshot {
    pub fn capture(model: &MapModel, connected: bool, status: &str, mode: &str) -> Self {
        let (linear_vel, angular_vel) = model.velocity();
        Self {
            timestamp_us: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_micros() as u64)
                .unwrap_or(0),
            connected,
            status: status.to_string(),
            mode: mode.to_string(),
            pose: model.pose(),
            linear_vel,
            angular_vel,
            goal: model.goal(),
            station_count: model.stations().len(),
            waypoint_count: model.waypoints().len(),
            has_grid: model.grid().is_some(),
        }
    }
}

/// Last-write-wins key/value store boundary
pub trait MirrorStore {
    fn put(&mut self, key: &str, value: Value) -> Result<()>;
    fn get(&self, key: &str) -> Result<Option<Value>>;
}

/// In-process store for tests and embedded monitors
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MirrorStore for MemoryStore {
    fn put(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }
}

/// File-backed store: one JSON object per file, rewritten on each put.
/// Crude but honest last-write-wins; the monitor polls it.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_all(&self) -> HashMap<String, Value> {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return HashMap::new();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }
}

impl MirrorStore for FileStore {
    fn put(&mut self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.read_all();
        entries.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(NetraError::Transport)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_vec(&entries)?).map_err(NetraError::Transport)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_all().remove(key))
    }
}

/// Console-side publisher
pub struct MirrorPublisher<S: MirrorStore> {
    store: S,
}

impl<S: MirrorStore> MirrorPublisher<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn publish_state(&mut self, snapshot: &StateSnapshot) -> Result<()> {
        self.store
            .put(KEY_ROBOT_STATE, serde_json::to_value(snapshot)?)
    }

    pub fn publish_log(&mut self, log: &EventLog) -> Result<()> {
        self.store
            .put(KEY_EVENT_LOG, serde_json::to_value(log.entries())?)?;
        if let Some(last) = log.last() {
            self.store
                .put(KEY_LAST_LOG_ENTRY, serde_json::to_value(last)?)?;
        }
        Ok(())
    }
}

/// Monitor-side reader. Missing or malformed entries read as `None`;
/// the monitor must keep running regardless of what the console wrote.
pub struct MirrorReader<S: MirrorStore> {
    store: S,
}

impl<S: MirrorStore> MirrorReader<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn read_state(&self) -> Option<StateSnapshot> {
        let value = self.store.get(KEY_ROBOT_STATE).ok()??;
        serde_json::from_value(value).ok()
    }

    pub fn read_log(&self) -> Option<Vec<LogEntry>> {
        let value = self.store.get(KEY_EVENT_LOG).ok()??;
        serde_json::from_value(value).ok()
    }

    pub fn read_last_entry(&self) -> Option<LogEntry> {
        let value = self.store.get(KEY_LAST_LOG_ENTRY).ok()??;
        serde_json::from_value(value).ok()
    }
}
