//! Grid model and path planning.
//!
//! This module provides:
//! - Operating area grid with obstacle border inflation
//! - A* planner producing full and simplified (waypoint) paths

mod astar;
mod grid;

pub use astar::{AStarPlanner, DIAGONAL_COST, Plan, STRAIGHT_COST, simplify};
pub use grid::{Grid, GridCoord, GridNode, NodeKind, WorldPoint};
