//! Navigation controller.
//!
//! Reconciles console intent (destination, home, map edits) with sensed
//! reality (position updates, discovered obstacles, reached waypoints). It is
//! the only component that calls the planner or hands waypoints to the
//! position subsystem.
//!
//! The grid and the navigation state sit behind one lock. Every public entry
//! point takes it exactly once, so a sensor event and a console command are
//! applied one after the other, never interleaved.

use std::sync::Arc;

use parking_lot::Mutex;

use super::state::NavigationState;
use crate::drive::{DriveCommand, SharedDrive};
use crate::error::Result;
use crate::planning::{AStarPlanner, Grid, GridCoord, NodeKind, WorldPoint};
use crate::protocol::{OutboundMessage, OutboundQueue};
use crate::sensor::{SensorEvent, SensorLink};

/// Cell the rover starts on.
pub const ORIGIN: GridCoord = GridCoord::new(0, 0);

struct NavCore {
    grid: Grid,
    state: NavigationState,
}

/// Owner of the grid and navigation state.
pub struct NavigationController {
    core: Mutex<NavCore>,
    planner: AStarPlanner,
    outbound: OutboundQueue,
    drive: SharedDrive,
    link: Arc<SensorLink>,
}

impl NavigationController {
    pub fn new(
        grid: Grid,
        outbound: OutboundQueue,
        drive: SharedDrive,
        link: Arc<SensorLink>,
    ) -> Self {
        Self {
            core: Mutex::new(NavCore {
                grid,
                state: NavigationState::new(ORIGIN),
            }),
            planner: AStarPlanner::new(),
            outbound,
            drive,
            link,
        }
    }

    /// Validate wire coordinates against the grid.
    pub fn cell(&self, x: i32, y: i32) -> Result<GridCoord> {
        self.core.lock().grid.checked(x, y)
    }

    /// Snapshot of the navigation state.
    pub fn state(&self) -> NavigationState {
        self.core.lock().state.clone()
    }

    pub fn kind(&self, cell: GridCoord) -> Option<NodeKind> {
        self.core.lock().grid.kind(cell)
    }

    pub fn world_from_node(&self, cell: GridCoord) -> WorldPoint {
        self.core.lock().grid.world_from_node(cell)
    }

    pub fn begin_session(&self) {
        self.core.lock().state.session_active = true;
    }

    pub fn end_session(&self) {
        let mut core = self.core.lock();
        core.state.session_active = false;
        core.state.motion_enabled = false;
    }

    /// Accept `cell` as the destination if it is OPEN and not the rover's
    /// own cell, then plan to it.
    pub fn set_destination(&self, cell: GridCoord) -> bool {
        let mut core = self.core.lock();
        if !core.grid.is_traversable(cell) || cell == core.state.rover {
            log::info!("Destination ({}) rejected", cell);
            return false;
        }

        log::info!("Destination set to ({})", cell);
        core.state.destination = Some(cell);
        self.replan_locked(&mut core, true);
        true
    }

    /// Drop the destination, stop the drive and abandon the current leg.
    pub fn clear_destination(&self) -> Result<()> {
        let mut core = self.core.lock();
        log::info!("Destination cleared");
        core.state.clear_destination();
        self.link.cancel();
        self.drive.lock().send_command(DriveCommand::Stop)
    }

    pub fn set_home(&self, cell: GridCoord) -> bool {
        let mut core = self.core.lock();
        if !core.grid.is_traversable(cell) {
            log::info!("Home ({}) rejected", cell);
            return false;
        }
        core.state.home = cell;
        true
    }

    /// Console map edit. OBSTACLE goes through [`Self::add_obstacle`]; any
    /// other kind is written directly and the plan is recomputed.
    pub fn update_node(&self, cell: GridCoord, kind: NodeKind) -> Result<()> {
        let mut core = self.core.lock();
        if kind == NodeKind::Obstacle {
            return self.add_obstacle_locked(&mut core, cell).map(|_| ());
        }

        let rover = core.state.rover;
        core.grid.set_node_kind(cell, kind, Some(rover))?;
        self.replan_locked(&mut core, true);
        Ok(())
    }

    /// Mark `cell` as an obstacle. Returns whether anything changed.
    pub fn add_obstacle(&self, cell: GridCoord) -> Result<bool> {
        let mut core = self.core.lock();
        self.add_obstacle_locked(&mut core, cell)
    }

    /// Recompute both paths and announce them.
    pub fn replan(&self) {
        let mut core = self.core.lock();
        self.replan_locked(&mut core, true);
    }

    /// Enable motion and dispatch the first waypoint.
    pub fn start_motion(&self) {
        let mut core = self.core.lock();
        core.state.motion_enabled = true;
        self.advance_locked(&mut core);
    }

    /// Stop the drive and abandon the current leg; the plan is kept.
    pub fn halt(&self) -> Result<()> {
        let _core = self.core.lock();
        self.link.abandon_leg();
        self.drive.lock().send_command(DriveCommand::Stop)
    }

    /// Hand the next waypoint to the position subsystem.
    pub fn advance_waypoint(&self) {
        let mut core = self.core.lock();
        self.advance_locked(&mut core);
    }

    pub fn handle_event(&self, event: SensorEvent) {
        match event {
            SensorEvent::PositionChanged(pos) => self.on_position_changed(pos),
            SensorEvent::ObstacleFound(pos) => self.on_obstacle_found(pos),
            SensorEvent::WaypointReached(pos) => self.on_waypoint_reached(pos),
        }
    }

    pub fn on_position_changed(&self, pos: WorldPoint) {
        let mut core = self.core.lock();
        let cell = match core.grid.node_from_world(pos) {
            Ok(cell) => cell,
            Err(e) => {
                log::debug!("Position ignored: {}", e);
                return;
            }
        };
        if cell == core.state.rover {
            return;
        }

        log::debug!("Rover moved to ({})", cell);
        core.state.rover = cell;
        if core.state.at_destination() {
            log::info!("Arrived at destination ({})", cell);
            core.state.clear_destination();
        } else {
            self.replan_locked(&mut core, true);
        }
        self.outbound.push(OutboundMessage::RoverAt(cell));
    }

    pub fn on_obstacle_found(&self, pos: WorldPoint) {
        let mut core = self.core.lock();
        let cell = match core.grid.node_from_world(pos) {
            Ok(cell) => cell,
            Err(e) => {
                log::debug!("Obstacle ignored: {}", e);
                return;
            }
        };
        if let Err(e) = self.add_obstacle_locked(&mut core, cell) {
            log::warn!("Failed to add obstacle at ({}): {}", cell, e);
        }
    }

    pub fn on_waypoint_reached(&self, pos: WorldPoint) {
        let mut core = self.core.lock();
        log::debug!("Waypoint reached at ({:.3}, {:.3})", pos.x, pos.y);

        if !self.advance_locked(&mut core) {
            return;
        }
        if core.state.simple_path.is_empty()
            || core.state.full_path.is_empty()
            || core.state.at_destination()
        {
            self.finish_locked(&mut core);
        }
    }

    fn add_obstacle_locked(&self, core: &mut NavCore, cell: GridCoord) -> Result<bool> {
        if core.grid.kind(cell) == Some(NodeKind::Obstacle) || cell == core.state.rover {
            return Ok(false);
        }

        let rover = core.state.rover;
        let borders = core.grid.set_node_kind(cell, NodeKind::Obstacle, Some(rover))?;
        log::info!("Obstacle at ({})", cell);
        self.outbound.push(OutboundMessage::NodeUpdate {
            cell,
            kind: NodeKind::Obstacle,
        });

        let Some(destination) = core.state.destination else {
            return Ok(true);
        };
        if destination == cell || borders.contains(&destination) {
            log::info!("Destination ({}) is no longer reachable", destination);
            core.state.clear_destination();
            return Ok(true);
        }

        self.replan_locked(core, true);
        if core.state.motion_enabled
            && let Some(next) = core.state.simple_path.pop_front()
        {
            log::debug!("Superseding current leg with ({})", next);
            self.link.supersede(core.grid.world_from_node(next));
        }
        Ok(true)
    }

    fn replan_locked(&self, core: &mut NavCore, announce: bool) {
        let Some(destination) = core.state.destination else {
            return;
        };

        let plan = self.planner.find_path(&core.grid, core.state.rover, destination);
        if plan.is_empty() {
            log::info!("No path from ({}) to ({})", core.state.rover, destination);
        }
        core.state.apply_plan(plan);

        if announce {
            self.outbound
                .push(OutboundMessage::FullPath(core.state.full_path.clone()));
            self.announce_simple(core);
        }
    }

    /// Returns whether a waypoint was dispatched.
    fn advance_locked(&self, core: &mut NavCore) -> bool {
        let Some(mut next) = core.state.simple_path.pop_front() else {
            self.finish_locked(core);
            return false;
        };
        if next == core.state.rover
            && let Some(after) = core.state.simple_path.pop_front()
        {
            next = after;
        }

        log::debug!("Next waypoint ({})", next);
        self.link.push_waypoint(core.grid.world_from_node(next));
        self.announce_simple(core);
        true
    }

    fn finish_locked(&self, core: &mut NavCore) {
        log::info!("Destination reached");
        core.state.motion_enabled = false;
        self.outbound.push(OutboundMessage::DestinationReached);
    }

    fn announce_simple(&self, core: &NavCore) {
        self.outbound.push(OutboundMessage::SimplePath(
            core.state.simple_path.iter().copied().collect(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::drive::{self, MockDrive};

    struct Fixture {
        nav: NavigationController,
        outbound: OutboundQueue,
        link: Arc<SensorLink>,
        history: Arc<Mutex<Vec<DriveCommand>>>,
    }

    /// 5x5 grid of 0.1m cells.
    fn fixture(border_thickness: usize, use_diagonals: bool) -> Fixture {
        let grid = Grid::new(&GridConfig {
            width_m: 0.5,
            height_m: 0.5,
            columns: 5,
            rows: 5,
            offset_x: 0.0,
            offset_y: 0.0,
            border_thickness,
            use_diagonals,
        });
        let outbound = OutboundQueue::new();
        let link = Arc::new(SensorLink::new());
        let mock = MockDrive::default();
        let history = mock.history();
        let nav = NavigationController::new(
            grid,
            outbound.clone(),
            drive::share(mock),
            Arc::clone(&link),
        );
        Fixture {
            nav,
            outbound,
            link,
            history,
        }
    }

    fn has_full_path(msgs: &[OutboundMessage]) -> bool {
        msgs.iter().any(|m| matches!(m, OutboundMessage::FullPath(_)))
    }

    #[test]
    fn test_destination_on_rover_rejected() {
        let f = fixture(0, true);
        assert!(!f.nav.set_destination(ORIGIN));
        assert!(f.nav.state().destination.is_none());
        assert!(f.outbound.is_empty());
    }

    #[test]
    fn test_destination_must_be_open() {
        let f = fixture(0, true);
        f.nav.update_node(GridCoord::new(3, 3), NodeKind::Border).unwrap();
        assert!(!f.nav.set_destination(GridCoord::new(3, 3)));
        assert!(!f.nav.set_home(GridCoord::new(3, 3)));
        assert!(f.nav.set_home(GridCoord::new(4, 4)));
        assert_eq!(f.nav.state().home, GridCoord::new(4, 4));
    }

    #[test]
    fn test_set_destination_announces_paths() {
        let f = fixture(0, true);
        assert!(f.nav.set_destination(GridCoord::new(4, 4)));

        let msgs = f.outbound.drain();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].to_string(), "FP 0 0 1 1 2 2 3 3 4 4 D");
        assert_eq!(msgs[1].to_string(), "SP 4 4 D");
    }

    #[test]
    fn test_replan_is_idempotent() {
        let f = fixture(1, false);
        f.nav.add_obstacle(GridCoord::new(2, 2)).unwrap();
        f.nav.set_destination(GridCoord::new(4, 4));
        let first = f.nav.state();

        f.nav.replan();
        assert_eq!(f.nav.state(), first);
        assert!(!first.full_path.is_empty());
    }

    #[test]
    fn test_arrival_short_circuit() {
        let f = fixture(0, true);
        f.nav.set_destination(GridCoord::new(2, 0));
        f.nav.start_motion();
        f.outbound.drain();

        let target = f.nav.world_from_node(GridCoord::new(2, 0));
        f.nav.on_position_changed(target);

        let state = f.nav.state();
        assert_eq!(state.rover, GridCoord::new(2, 0));
        assert!(state.destination.is_none());
        assert!(state.full_path.is_empty());
        assert!(state.simple_path.is_empty());
        assert_eq!(
            f.outbound.drain(),
            vec![OutboundMessage::RoverAt(GridCoord::new(2, 0))]
        );

        f.nav.on_waypoint_reached(target);
        assert_eq!(f.outbound.drain(), vec![OutboundMessage::DestinationReached]);
        assert!(!f.nav.state().motion_enabled);
    }

    #[test]
    fn test_position_change_replans() {
        let f = fixture(0, false);
        f.nav.set_destination(GridCoord::new(3, 0));
        f.outbound.drain();

        f.nav.on_position_changed(f.nav.world_from_node(GridCoord::new(1, 0)));
        let msgs = f.outbound.drain();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0].to_string(), "FP 1 0 2 0 3 0 D");
        assert_eq!(msgs[2], OutboundMessage::RoverAt(GridCoord::new(1, 0)));

        // Same cell, nothing happens
        f.nav.on_position_changed(WorldPoint::new(0.12, 0.02));
        assert!(f.outbound.is_empty());
    }

    #[test]
    fn test_out_of_bounds_events_ignored() {
        let f = fixture(0, true);
        f.nav.on_position_changed(WorldPoint::new(-0.1, 0.2));
        f.nav.on_obstacle_found(WorldPoint::new(0.2, 0.9));
        assert!(f.outbound.is_empty());
        assert_eq!(f.nav.state().rover, ORIGIN);
    }

    #[test]
    fn test_obstacle_inside_border_clears_destination() {
        let f = fixture(1, true);
        f.nav.set_destination(GridCoord::new(3, 3));
        f.outbound.drain();

        f.nav.on_obstacle_found(f.nav.world_from_node(GridCoord::new(3, 2)));

        let state = f.nav.state();
        assert!(state.destination.is_none());
        assert!(state.full_path.is_empty());
        assert!(state.simple_path.is_empty());

        let msgs = f.outbound.drain();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].to_string(), "N 3 2 1");
        assert!(!has_full_path(&msgs));
    }

    #[test]
    fn test_obstacle_supersedes_current_leg() {
        let f = fixture(1, true);
        f.nav.set_destination(GridCoord::new(4, 4));
        f.nav.start_motion();
        f.link.push_waypoint(WorldPoint::new(0.45, 0.45));
        assert_eq!(f.link.pending().len(), 2);
        f.outbound.drain();

        assert!(f.nav.add_obstacle(GridCoord::new(2, 2)).unwrap());

        let state = f.nav.state();
        assert_eq!(state.destination, Some(GridCoord::new(4, 4)));
        assert!(!state.full_path.is_empty());
        assert!(!state.full_path.contains(&GridCoord::new(2, 2)));

        let pending = f.link.pending();
        assert_eq!(pending.len(), 1);
        assert!(f.link.should_abandon());
        let next = state.full_path.iter().find(|&&c| f.nav.world_from_node(c) == pending[0]);
        assert!(next.is_some());

        assert!(has_full_path(&f.outbound.drain()));
    }

    #[test]
    fn test_obstacle_without_motion_keeps_link() {
        let f = fixture(1, true);
        f.nav.set_destination(GridCoord::new(4, 4));
        f.nav.add_obstacle(GridCoord::new(2, 2)).unwrap();

        assert!(f.link.pending().is_empty());
        assert!(!f.link.should_abandon());
        assert!(!f.nav.state().simple_path.is_empty());
    }

    #[test]
    fn test_obstacle_noops() {
        let f = fixture(1, true);
        assert!(!f.nav.add_obstacle(ORIGIN).unwrap());
        assert_eq!(f.nav.kind(ORIGIN), Some(NodeKind::Open));

        assert!(f.nav.add_obstacle(GridCoord::new(3, 3)).unwrap());
        f.outbound.drain();
        assert!(!f.nav.add_obstacle(GridCoord::new(3, 3)).unwrap());
        assert!(f.outbound.is_empty());
    }

    #[test]
    fn test_obstacle_never_borders_rover() {
        let f = fixture(2, true);
        f.nav.add_obstacle(GridCoord::new(1, 1)).unwrap();
        assert_eq!(f.nav.kind(ORIGIN), Some(NodeKind::Open));
        assert_eq!(f.nav.kind(GridCoord::new(0, 1)), Some(NodeKind::Border));
    }

    #[test]
    fn test_clear_destination_stops_everything() {
        let f = fixture(0, true);
        f.nav.set_destination(GridCoord::new(4, 0));
        f.nav.start_motion();
        assert_eq!(f.link.pending().len(), 1);

        f.nav.clear_destination().unwrap();

        let state = f.nav.state();
        assert!(state.destination.is_none());
        assert!(state.full_path.is_empty());
        assert!(f.link.pending().is_empty());
        assert!(f.link.should_abandon());
        assert_eq!(f.history.lock().last(), Some(&DriveCommand::Stop));
    }

    #[test]
    fn test_go_dispatches_first_waypoint() {
        let f = fixture(0, false);
        f.nav.set_destination(GridCoord::new(4, 0));
        f.outbound.drain();

        f.nav.start_motion();
        assert!(f.nav.state().motion_enabled);
        assert_eq!(f.link.pending(), vec![f.nav.world_from_node(GridCoord::new(4, 0))]);
        assert_eq!(f.outbound.drain(), vec![OutboundMessage::SimplePath(Vec::new())]);
    }

    #[test]
    fn test_advance_without_waypoints_reports_arrival() {
        let f = fixture(0, true);
        f.nav.start_motion();

        assert!(!f.nav.state().motion_enabled);
        assert!(f.link.pending().is_empty());
        assert_eq!(f.outbound.drain(), vec![OutboundMessage::DestinationReached]);
    }

    #[test]
    fn test_final_leg_dispatch_reports_arrival() {
        let f = fixture(0, false);
        let goal = GridCoord::new(4, 4);
        f.nav.set_destination(goal);
        f.nav.start_motion();

        let first = f.link.take_next(std::time::Duration::ZERO).unwrap();
        f.nav.on_position_changed(first);
        assert_eq!(f.nav.state().simple_path, [goal]);
        f.outbound.drain();

        f.nav.on_waypoint_reached(first);

        let state = f.nav.state();
        assert!(state.simple_path.is_empty());
        assert!(!state.motion_enabled);
        assert_eq!(state.destination, Some(goal));
        assert_eq!(f.link.pending(), vec![f.nav.world_from_node(goal)]);
        assert_eq!(
            f.outbound.drain(),
            vec![
                OutboundMessage::SimplePath(Vec::new()),
                OutboundMessage::DestinationReached,
            ]
        );
    }

    #[test]
    fn test_halt_keeps_plan() {
        let f = fixture(0, true);
        f.nav.set_destination(GridCoord::new(4, 4));
        f.nav.halt().unwrap();

        assert!(f.link.should_abandon());
        assert_eq!(f.nav.state().destination, Some(GridCoord::new(4, 4)));
        assert_eq!(f.history.lock().as_slice(), &[DriveCommand::Stop]);
    }

    #[test]
    fn test_open_edit_replans() {
        let f = fixture(0, false);
        for y in 0..4 {
            f.nav.add_obstacle(GridCoord::new(2, y)).unwrap();
        }
        f.nav.set_destination(GridCoord::new(4, 0));
        let detour = f.nav.state().full_path.len();

        f.nav.update_node(GridCoord::new(2, 0), NodeKind::Open).unwrap();
        assert_eq!(f.nav.state().full_path.len(), 5);
        assert!(detour > 5);
    }
}
