//! InfernoNav - On-board navigation server for a GPS-guided rover
//!
//! A single operator console connects over TCP, edits the grid map and sets
//! destinations. The server plans paths with A*, hands waypoints to the
//! position subsystem and replans whenever the rover moves or an obstacle is
//! discovered.
//!
//! ## Threads
//!
//! - Session loop: reads console commands, writes queued messages
//! - Sensor: simulated GPS moving toward waypoints
//! - Event pump: applies sensor events to the navigation controller

pub mod config;
pub mod drive;
pub mod error;
pub mod navigation;
pub mod planning;
pub mod protocol;
pub mod sensor;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use server::NavServer;
