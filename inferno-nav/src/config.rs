//! Configuration loading for InfernoNav
//!
//! Every field has a default, so a partial TOML file (or none at all) is valid.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Operator console connection settings
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// TCP bind address for the single operator session
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Bounded wait for inbound bytes per gateway iteration (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum bytes read per gateway iteration
    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
}

/// Operating area model
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GridConfig {
    /// Physical width of the area in meters
    #[serde(default = "default_width")]
    pub width_m: f32,

    /// Physical height of the area in meters
    #[serde(default = "default_height")]
    pub height_m: f32,

    /// Number of grid columns
    #[serde(default = "default_columns")]
    pub columns: usize,

    /// Number of grid rows
    #[serde(default = "default_rows")]
    pub rows: usize,

    /// World X of the grid's lower-left corner
    #[serde(default)]
    pub offset_x: f32,

    /// World Y of the grid's lower-left corner
    #[serde(default)]
    pub offset_y: f32,

    /// Border inflation around obstacles, in cells
    #[serde(default = "default_border_thickness")]
    pub border_thickness: usize,

    /// 8-connected planning when true, 4-connected otherwise
    #[serde(default = "default_use_diagonals")]
    pub use_diagonals: bool,
}

/// Drive sink parameters
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DriveConfig {
    /// Default wheel speed handed to the drive at startup
    #[serde(default = "default_speed")]
    pub speed: u32,

    /// Manual drive: both magnitudes above this select backward motion
    #[serde(default = "default_backward_threshold")]
    pub backward_threshold: i32,

    /// Warn below this battery voltage
    #[serde(default = "default_low_voltage")]
    pub low_voltage: f32,

    /// Log an error below this battery voltage
    #[serde(default = "default_critical_voltage")]
    pub critical_voltage: f32,

    /// Voltage reported by the mock drive
    #[serde(default = "default_battery_voltage")]
    pub battery_voltage: f32,
}

/// Simulated position/obstacle subsystem
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SensorConfig {
    /// Distance travelled per tick (meters)
    #[serde(default = "default_step")]
    pub step_m: f32,

    /// Tick interval (milliseconds)
    #[serde(default = "default_tick")]
    pub tick_ms: u64,

    /// Distance at which a waypoint counts as reached (meters)
    #[serde(default = "default_arrival_tolerance")]
    pub arrival_tolerance_m: f32,

    /// Range at which hidden obstacles are detected (meters)
    #[serde(default = "default_detection_range")]
    pub detection_range_m: f32,

    /// Hidden obstacles in world coordinates
    #[serde(default)]
    pub obstacles: Vec<[f32; 2]>,
}

/// Logging configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default log filter (trace, debug, info, warn, error); RUST_LOG wins
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            poll_interval_ms: default_poll_interval(),
            recv_buffer_size: default_recv_buffer_size(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width_m: default_width(),
            height_m: default_height(),
            columns: default_columns(),
            rows: default_rows(),
            offset_x: 0.0,
            offset_y: 0.0,
            border_thickness: default_border_thickness(),
            use_diagonals: default_use_diagonals(),
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            backward_threshold: default_backward_threshold(),
            low_voltage: default_low_voltage(),
            critical_voltage: default_critical_voltage(),
            battery_voltage: default_battery_voltage(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            step_m: default_step(),
            tick_ms: default_tick(),
            arrival_tolerance_m: default_arrival_tolerance(),
            detection_range_m: default_detection_range(),
            obstacles: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0:10000".to_string()
}
fn default_poll_interval() -> u64 {
    100
}
fn default_recv_buffer_size() -> usize {
    1024
}
fn default_width() -> f32 {
    2.5
}
fn default_height() -> f32 {
    3.5
}
fn default_columns() -> usize {
    20
}
fn default_rows() -> usize {
    28
}
fn default_border_thickness() -> usize {
    2
}
fn default_use_diagonals() -> bool {
    true
}
fn default_speed() -> u32 {
    25
}
fn default_backward_threshold() -> i32 {
    25
}
fn default_low_voltage() -> f32 {
    9.0
}
fn default_critical_voltage() -> f32 {
    8.0
}
fn default_battery_voltage() -> f32 {
    12.0
}
fn default_step() -> f32 {
    0.05
}
fn default_tick() -> u64 {
    100
}
fn default_arrival_tolerance() -> f32 {
    0.01
}
fn default_detection_range() -> f32 {
    0.15
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the grid cannot be built from
    pub fn validate(&self) -> Result<()> {
        let g = &self.grid;
        if g.columns == 0 || g.rows == 0 {
            return Err(Error::Config("grid must have at least one cell".into()));
        }
        if g.width_m <= 0.0 || g.height_m <= 0.0 {
            return Err(Error::Config("grid dimensions must be positive".into()));
        }
        if self.sensor.step_m <= 0.0 {
            return Err(Error::Config("sensor.step_m must be positive".into()));
        }
        Ok(())
    }
}

impl NetworkConfig {
    /// Bounded read wait per gateway iteration; never zero, which would
    /// disable the timeout
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}
