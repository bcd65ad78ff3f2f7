//! Navigation state record.

use std::collections::VecDeque;

use crate::planning::{GridCoord, Plan};

/// Rover position, goal and current plan.
///
/// Owned by the navigation controller; copies handed out are snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationState {
    pub rover: GridCoord,
    pub destination: Option<GridCoord>,
    pub home: GridCoord,
    /// Every cell from the rover to the destination
    pub full_path: Vec<GridCoord>,
    /// Waypoints still to be handed to the position subsystem
    pub simple_path: VecDeque<GridCoord>,
    pub motion_enabled: bool,
    pub session_active: bool,
}

impl NavigationState {
    /// Fresh state with the rover and home at `origin`.
    pub fn new(origin: GridCoord) -> Self {
        Self {
            rover: origin,
            destination: None,
            home: origin,
            full_path: Vec::new(),
            simple_path: VecDeque::new(),
            motion_enabled: false,
            session_active: false,
        }
    }

    /// Drop the destination together with both paths.
    pub fn clear_destination(&mut self) {
        self.destination = None;
        self.full_path.clear();
        self.simple_path.clear();
    }

    /// Replace both paths with a planner result.
    pub fn apply_plan(&mut self, plan: Plan) {
        self.full_path = plan.full;
        self.simple_path = plan.simple.into();
    }

    /// Whether the rover is standing on its destination.
    pub fn at_destination(&self) -> bool {
        self.destination == Some(self.rover)
    }
}
