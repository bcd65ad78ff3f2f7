//! Position and obstacle sensing.
//!
//! The sensing side talks to the navigation core through two channels:
//! - [`SensorEvent`]s flowing into the core over a crossbeam channel
//! - waypoints and the abandon flag flowing out through a [`SensorLink`]

mod link;
mod simulator;

pub use link::SensorLink;
pub use simulator::{SensorHandle, SimulatedGps};

use crate::planning::WorldPoint;

/// Event reported by the position subsystem.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SensorEvent {
    /// The rover moved
    PositionChanged(WorldPoint),
    /// An obstacle was detected at this position
    ObstacleFound(WorldPoint),
    /// The rover reached the waypoint it was travelling to
    WaypointReached(WorldPoint),
}
