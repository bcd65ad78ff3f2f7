//! Waypoint link between the navigation controller and the position subsystem.
//!
//! The controller pushes waypoints and raises the abandon flag; the position
//! subsystem pops waypoints and polls the flag between motion steps. All
//! three pieces of state sit behind one lock so that replacing the pending
//! waypoints and abandoning the current leg happen as a single step.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::planning::WorldPoint;

#[derive(Debug, Default)]
struct LinkState {
    pending: VecDeque<WorldPoint>,
    abandon: bool,
    shutdown: bool,
}

/// Shared waypoint queue plus the abandon and shutdown flags.
#[derive(Debug, Default)]
pub struct SensorLink {
    state: Mutex<LinkState>,
    wake: Condvar,
}

impl SensorLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a waypoint behind any already pending.
    pub fn push_waypoint(&self, target: WorldPoint) {
        self.state.lock().pending.push_back(target);
        self.wake.notify_one();
    }

    /// Drop pending waypoints, abandon the current leg and queue `target`.
    pub fn supersede(&self, target: WorldPoint) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.abandon = true;
        state.pending.push_back(target);
        drop(state);
        self.wake.notify_one();
    }

    /// Drop pending waypoints and abandon the current leg.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.abandon = true;
    }

    /// Abandon the current leg, keeping pending waypoints.
    pub fn abandon_leg(&self) {
        self.state.lock().abandon = true;
    }

    /// Whether the leg in progress should stop at the next step.
    pub fn should_abandon(&self) -> bool {
        let state = self.state.lock();
        state.abandon || state.shutdown
    }

    /// Wait up to `timeout` for the next waypoint.
    ///
    /// Taking a waypoint starts a new leg, so the abandon flag is reset in
    /// the same critical section. Returns `None` on timeout or shutdown.
    pub fn take_next(&self, timeout: Duration) -> Option<WorldPoint> {
        let mut state = self.state.lock();
        while state.pending.is_empty() && !state.shutdown {
            if self.wake.wait_for(&mut state, timeout).timed_out() {
                break;
            }
        }
        if state.shutdown {
            return None;
        }
        let next = state.pending.pop_front()?;
        state.abandon = false;
        Some(next)
    }

    /// Ask the position subsystem to stop; also abandons the current leg.
    pub fn request_shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        state.abandon = true;
        drop(state);
        self.wake.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Snapshot of the waypoints not yet taken.
    pub fn pending(&self) -> Vec<WorldPoint> {
        self.state.lock().pending.iter().copied().collect()
    }
}
