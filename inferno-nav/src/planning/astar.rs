//! A* shortest path search over the operating area grid.
//!
//! Step costs are integers: 10 for an orthogonal step and 14 for a diagonal
//! step (≈ 10·√2). Only OPEN cells are entered; the start cell is exempt since
//! the rover already occupies it. Diagonal steps may not cut the corner of a
//! non-traversable cell.
//!
//! Ties are broken deterministically:
//! 1. the open set pops the lowest f, then the lowest h, then the lowest
//!    column, then the lowest row;
//! 2. when two parents give a cell the same cost, the one continuing the
//!    current direction of travel wins, otherwise the first found is kept.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::grid::{Grid, GridCoord};

/// Cost of an orthogonal step
pub const STRAIGHT_COST: u32 = 10;
/// Cost of a diagonal step
pub const DIAGONAL_COST: u32 = 14;

/// Neighbour offsets in expansion order
const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
const DIAGONAL: [(i32, i32); 4] = [(1, 1), (-1, 1), (-1, -1), (1, -1)];

/// Result of a planner invocation.
///
/// An empty plan means no path exists; callers must check [`Plan::is_empty`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    /// Every cell from start to goal, both included
    pub full: Vec<GridCoord>,
    /// Direction-change cells plus the goal; never includes the start
    pub simple: Vec<GridCoord>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    /// Number of steps along the full path
    pub fn steps(&self) -> usize {
        self.full.len().saturating_sub(1)
    }
}

/// Node in the open set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SearchNode {
    coord: GridCoord,
    f: u32,
    h: u32,
}

impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.coord.cmp(&self.coord))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Grid path planner.
#[derive(Clone, Copy, Debug, Default)]
pub struct AStarPlanner;

impl AStarPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Shortest path from `start` to `goal`.
    ///
    /// Returns an empty plan when `start == goal`, when the goal is not OPEN,
    /// or when no path exists.
    pub fn find_path(&self, grid: &Grid, start: GridCoord, goal: GridCoord) -> Plan {
        if start == goal || !grid.contains(start) || !grid.is_traversable(goal) {
            return Plan::default();
        }

        match self.search(grid, start, goal) {
            Some(full) => {
                let simple = simplify(&full);
                Plan { full, simple }
            }
            None => {
                log::debug!("No path from ({}) to ({})", start, goal);
                Plan::default()
            }
        }
    }

    fn search(&self, grid: &Grid, start: GridCoord, goal: GridCoord) -> Option<Vec<GridCoord>> {
        let diagonals = grid.use_diagonals();
        let mut open_set = BinaryHeap::new();
        let mut g_score: HashMap<GridCoord, u32> = HashMap::new();
        let mut parent: HashMap<GridCoord, GridCoord> = HashMap::new();
        let mut closed: HashSet<GridCoord> = HashSet::new();

        g_score.insert(start, 0);
        let h = heuristic(start, goal, diagonals);
        open_set.push(SearchNode { coord: start, f: h, h });

        while let Some(SearchNode { coord: current, .. }) = open_set.pop() {
            if current == goal {
                return Some(reconstruct_path(&parent, goal));
            }
            if !closed.insert(current) {
                continue;
            }

            let current_g = g_score[&current];

            let steps = ORTHOGONAL
                .iter()
                .map(|&o| (o, STRAIGHT_COST))
                .chain(
                    DIAGONAL
                        .iter()
                        .filter(|_| diagonals)
                        .map(|&o| (o, DIAGONAL_COST)),
                );

            for ((dx, dy), cost) in steps {
                let neighbor = GridCoord::new(current.x + dx, current.y + dy);
                if !grid.is_traversable(neighbor) || closed.contains(&neighbor) {
                    continue;
                }
                // No corner cutting
                if dx != 0
                    && dy != 0
                    && (!grid.is_traversable(GridCoord::new(current.x + dx, current.y))
                        || !grid.is_traversable(GridCoord::new(current.x, current.y + dy)))
                {
                    continue;
                }

                let new_g = current_g + cost;
                match g_score.get(&neighbor) {
                    Some(&existing) if new_g > existing => {}
                    Some(&existing) if new_g == existing => {
                        let incumbent = parent[&neighbor];
                        if continues_straight(&parent, current, neighbor)
                            && !continues_straight(&parent, incumbent, neighbor)
                        {
                            parent.insert(neighbor, current);
                        }
                    }
                    _ => {
                        g_score.insert(neighbor, new_g);
                        parent.insert(neighbor, current);
                        let h = heuristic(neighbor, goal, diagonals);
                        open_set.push(SearchNode {
                            coord: neighbor,
                            f: new_g + h,
                            h,
                        });
                    }
                }
            }
        }

        None
    }
}

/// Octile distance with diagonals, Manhattan without.
#[inline]
fn heuristic(from: GridCoord, to: GridCoord, diagonals: bool) -> u32 {
    let dx = (to.x - from.x).unsigned_abs();
    let dy = (to.y - from.y).unsigned_abs();
    if diagonals {
        let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
        DIAGONAL_COST * lo + STRAIGHT_COST * (hi - lo)
    } else {
        STRAIGHT_COST * (dx + dy)
    }
}

/// Whether stepping `via -> to` keeps the direction `via` was entered with.
fn continues_straight(
    parent: &HashMap<GridCoord, GridCoord>,
    via: GridCoord,
    to: GridCoord,
) -> bool {
    match parent.get(&via) {
        Some(before) => before.direction_to(&via) == via.direction_to(&to),
        None => false,
    }
}

fn reconstruct_path(parent: &HashMap<GridCoord, GridCoord>, goal: GridCoord) -> Vec<GridCoord> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&p) = parent.get(&current) {
        path.push(p);
        current = p;
    }
    path.reverse();
    path
}

/// Cells of `full` at which the direction of travel changes, plus the goal.
pub fn simplify(full: &[GridCoord]) -> Vec<GridCoord> {
    let Some(&goal) = full.last() else {
        return Vec::new();
    };
    if full.len() < 2 {
        return Vec::new();
    }

    let mut simple: Vec<GridCoord> = full
        .windows(3)
        .filter(|w| w[0].direction_to(&w[1]) != w[1].direction_to(&w[2]))
        .map(|w| w[1])
        .collect();
    simple.push(goal);
    simple
}
