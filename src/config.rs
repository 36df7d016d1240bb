//! Configuration loading for NetraConsole

use crate::error::{NetraError, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Clone, Debug, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub topics: TopicConfig,
    #[serde(default)]
    pub teleop: TeleopConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
}

/// Bridge connection settings
#[derive(Clone, Debug, Deserialize)]
pub struct ConnectionConfig {
    /// Bridge endpoint address (default: 127.0.0.1:9090)
    #[serde(default = "default_bridge_url")]
    pub bridge_url: String,

    /// Connect timeout in milliseconds (default: 12000)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// Topic names used on the bridge
#[derive(Clone, Debug, Deserialize)]
pub struct TopicConfig {
    /// Outbound velocity command topic
    #[serde(default = "default_cmd_vel_topic")]
    pub cmd_vel: String,

    /// Inbound pose/velocity telemetry topic
    #[serde(default = "default_odom_topic")]
    pub odom: String,

    /// Inbound occupancy grid topic
    #[serde(default = "default_map_topic")]
    pub map: String,
}

/// Teleoperation speed pair
#[derive(Clone, Debug, Deserialize)]
pub struct TeleopConfig {
    /// Linear speed for directional controls in m/s (default: 0.2)
    #[serde(default = "default_linear_speed")]
    pub linear_speed: f32,

    /// Angular speed for directional controls in rad/s (default: 0.5)
    #[serde(default = "default_angular_speed")]
    pub angular_speed: f32,
}

/// Render surface and output settings
#[derive(Clone, Debug, Deserialize)]
pub struct RenderConfig {
    /// Drawing surface width in pixels (default: 800)
    #[serde(default = "default_surface_width")]
    pub surface_width: f32,

    /// Drawing surface height in pixels (default: 600)
    #[serde(default = "default_surface_height")]
    pub surface_height: f32,

    /// Sensor range ring radius in meters (default: 3.5)
    #[serde(default = "default_sensor_range")]
    pub sensor_range_m: f32,

    /// Path the console writes the rendered view to
    #[serde(default = "default_view_path")]
    pub view_path: String,
}

/// Cross-view mirror settings
#[derive(Clone, Debug, Deserialize)]
pub struct MirrorConfig {
    /// Path of the shared key/value store file
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Monitor poll interval in milliseconds (default: 500)
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

// Default value functions
fn default_bridge_url() -> String {
    "127.0.0.1:9090".to_string()
}
fn default_timeout() -> u64 {
    12000
}
fn default_cmd_vel_topic() -> String {
    "/cmd_vel".to_string()
}
fn default_odom_topic() -> String {
    "/odom".to_string()
}
fn default_map_topic() -> String {
    "/map".to_string()
}
fn default_linear_speed() -> f32 {
    0.2
}
fn default_angular_speed() -> f32 {
    0.5
}
fn default_surface_width() -> f32 {
    800.0
}
fn default_surface_height() -> f32 {
    600.0
}
fn default_sensor_range() -> f32 {
    3.5
}
fn default_view_path() -> String {
    "output/view.svg".to_string()
}
fn default_store_path() -> String {
    "output/mirror.json".to_string()
}
fn default_poll_ms() -> u64 {
    500
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            bridge_url: default_bridge_url(),
            timeout_ms: default_timeout(),
        }
    }
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            cmd_vel: default_cmd_vel_topic(),
            odom: default_odom_topic(),
            map: default_map_topic(),
        }
    }
}

impl Default for TeleopConfig {
    fn default() -> Self {
        Self {
            linear_speed: default_linear_speed(),
            angular_speed: default_angular_speed(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            surface_width: default_surface_width(),
            surface_height: default_surface_height(),
            sensor_range_m: default_sensor_range(),
            view_path: default_view_path(),
        }
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            poll_ms: default_poll_ms(),
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            topics: TopicConfig::default(),
            teleop: TeleopConfig::default(),
            render: RenderConfig::default(),
            mirror: MirrorConfig::default(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NetraError::Config(format!("Failed to read config file: {}", e)))?;
        let config: ConsoleConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ConsoleConfig::default();
        assert_eq!(config.connection.bridge_url, "127.0.0.1:9090");
        assert_eq!(config.connection.timeout_ms, 12000);
        assert_eq!(config.topics.cmd_vel, "/cmd_vel");
        assert!(config.teleop.linear_speed > 0.0);
        assert!(config.render.surface_width > 0.0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: ConsoleConfig = toml::from_str(
            r#"
            [connection]
            bridge_url = "10.0.0.5:9090"

            [teleop]
            linear_speed = 0.35
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.bridge_url, "10.0.0.5:9090");
        assert_eq!(config.connection.timeout_ms, 12000);
        assert_eq!(config.teleop.linear_speed, 0.35);
        assert_eq!(config.teleop.angular_speed, 0.5);
        assert_eq!(config.topics.map, "/map");
    }
}
