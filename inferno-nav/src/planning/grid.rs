//! Operating area grid with obstacle border inflation.
//!
//! The grid is created once from [`GridConfig`] and never resized. Cell kinds
//! change only through [`Grid::set_node_kind`].

use std::collections::BTreeSet;
use std::fmt;

use crate::config::GridConfig;
use crate::error::{Error, Result};

/// Integer cell coordinate (column, row).
///
/// Ordering is by column, then row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Unit step from `self` towards an adjacent `other`.
    #[inline]
    pub fn direction_to(&self, other: &GridCoord) -> (i32, i32) {
        ((other.x - self.x).signum(), (other.y - self.y).signum())
    }

    #[inline]
    pub fn manhattan_distance(&self, other: &GridCoord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    #[inline]
    pub fn chebyshev_distance(&self, other: &GridCoord) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

/// Continuous position in meters.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct WorldPoint {
    pub x: f32,
    pub y: f32,
}

impl WorldPoint {
    pub const ZERO: WorldPoint = WorldPoint { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(&self, other: &WorldPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Cell classification. The numeric codes are the wire encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    #[default]
    Open,
    Obstacle,
    Border,
}

impl NodeKind {
    /// Decode a wire kind code.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(NodeKind::Open),
            1 => Some(NodeKind::Obstacle),
            2 => Some(NodeKind::Border),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            NodeKind::Open => 0,
            NodeKind::Obstacle => 1,
            NodeKind::Border => 2,
        }
    }
}

/// A single cell of the operating area.
#[derive(Clone, Debug)]
pub struct GridNode {
    pub coord: GridCoord,
    pub kind: NodeKind,
    /// Physical center of the cell
    pub center: WorldPoint,
}

/// Operating area model.
#[derive(Clone, Debug)]
pub struct Grid {
    columns: usize,
    rows: usize,
    width_m: f32,
    height_m: f32,
    origin: WorldPoint,
    cell_width: f32,
    cell_height: f32,
    border_thickness: i32,
    use_diagonals: bool,
    /// Row-major cell storage
    nodes: Vec<GridNode>,
}

impl Grid {
    /// Build an all-OPEN grid.
    pub fn new(config: &GridConfig) -> Self {
        let columns = config.columns.max(1);
        let rows = config.rows.max(1);
        let cell_width = config.width_m / columns as f32;
        let cell_height = config.height_m / rows as f32;
        let origin = WorldPoint::new(config.offset_x, config.offset_y);

        let mut nodes = Vec::with_capacity(columns * rows);
        for y in 0..rows as i32 {
            for x in 0..columns as i32 {
                nodes.push(GridNode {
                    coord: GridCoord::new(x, y),
                    kind: NodeKind::Open,
                    center: WorldPoint::new(
                        origin.x + (x as f32 + 0.5) * cell_width,
                        origin.y + (y as f32 + 0.5) * cell_height,
                    ),
                });
            }
        }

        Self {
            columns,
            rows,
            width_m: config.width_m,
            height_m: config.height_m,
            origin,
            cell_width,
            cell_height,
            border_thickness: config.border_thickness as i32,
            use_diagonals: config.use_diagonals,
            nodes,
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn use_diagonals(&self) -> bool {
        self.use_diagonals
    }

    pub fn border_thickness(&self) -> usize {
        self.border_thickness as usize
    }

    #[inline]
    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as usize) < self.columns && (coord.y as usize) < self.rows
    }

    /// Validate wire coordinates.
    pub fn checked(&self, x: i32, y: i32) -> Result<GridCoord> {
        let coord = GridCoord::new(x, y);
        if self.contains(coord) {
            Ok(coord)
        } else {
            Err(Error::CellOutOfRange { x, y })
        }
    }

    #[inline]
    fn index(&self, coord: GridCoord) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.y as usize * self.columns + coord.x as usize)
    }

    pub fn node(&self, coord: GridCoord) -> Option<&GridNode> {
        self.index(coord).map(|i| &self.nodes[i])
    }

    pub fn kind(&self, coord: GridCoord) -> Option<NodeKind> {
        self.node(coord).map(|n| n.kind)
    }

    /// OPEN cells are the only traversable ones.
    #[inline]
    pub fn is_traversable(&self, coord: GridCoord) -> bool {
        self.kind(coord) == Some(NodeKind::Open)
    }

    /// Set a cell's kind. Marking a cell OBSTACLE inflates a border of
    /// `border_thickness` cells around it (Chebyshev distance with diagonals,
    /// Manhattan without), skipping OBSTACLE cells and `protect`.
    ///
    /// Returns every BORDER cell after the update.
    pub fn set_node_kind(
        &mut self,
        coord: GridCoord,
        kind: NodeKind,
        protect: Option<GridCoord>,
    ) -> Result<BTreeSet<GridCoord>> {
        let idx = self
            .index(coord)
            .ok_or(Error::CellOutOfRange { x: coord.x, y: coord.y })?;
        self.nodes[idx].kind = kind;

        if kind == NodeKind::Obstacle {
            self.inflate(coord, protect);
        }

        Ok(self.all_borders())
    }

    fn inflate(&mut self, center: GridCoord, protect: Option<GridCoord>) {
        let t = self.border_thickness;
        for dy in -t..=t {
            for dx in -t..=t {
                if dx == 0 && dy == 0 {
                    continue;
                }
                if !self.use_diagonals && dx.abs() + dy.abs() > t {
                    continue;
                }
                let cell = GridCoord::new(center.x + dx, center.y + dy);
                if Some(cell) == protect {
                    continue;
                }
                if let Some(i) = self.index(cell)
                    && self.nodes[i].kind != NodeKind::Obstacle
                {
                    self.nodes[i].kind = NodeKind::Border;
                }
            }
        }
    }

    /// All cells currently marked BORDER.
    pub fn all_borders(&self) -> BTreeSet<GridCoord> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Border)
            .map(|n| n.coord)
            .collect()
    }

    /// Cell containing a continuous position. Positions on the far edge
    /// belong to the last column/row.
    pub fn node_from_world(&self, pos: WorldPoint) -> Result<GridCoord> {
        let rx = pos.x - self.origin.x;
        let ry = pos.y - self.origin.y;
        if !(rx >= 0.0 && ry >= 0.0 && rx <= self.width_m && ry <= self.height_m) {
            return Err(Error::OutOfBounds { x: pos.x, y: pos.y });
        }

        let x = ((rx / self.cell_width).floor() as usize).min(self.columns - 1);
        let y = ((ry / self.cell_height).floor() as usize).min(self.rows - 1);
        Ok(GridCoord::new(x as i32, y as i32))
    }

    /// Physical center of a cell.
    pub fn world_from_node(&self, coord: GridCoord) -> WorldPoint {
        match self.node(coord) {
            Some(node) => node.center,
            None => WorldPoint::new(
                self.origin.x + (coord.x as f32 + 0.5) * self.cell_width,
                self.origin.y + (coord.y as f32 + 0.5) * self.cell_height,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(columns: usize, rows: usize, thickness: usize, diagonals: bool) -> Grid {
        Grid::new(&GridConfig {
            width_m: columns as f32 * 0.1,
            height_m: rows as f32 * 0.1,
            columns,
            rows,
            offset_x: 0.0,
            offset_y: 0.0,
            border_thickness: thickness,
            use_diagonals: diagonals,
        })
    }

    #[test]
    fn test_new_grid_is_open() {
        let g = grid(4, 3, 1, true);
        assert_eq!(g.columns(), 4);
        assert_eq!(g.rows(), 3);
        assert!(g.all_borders().is_empty());
        assert!(g.is_traversable(GridCoord::new(3, 2)));
        assert!(!g.is_traversable(GridCoord::new(4, 0)));
        assert!(g.checked(-1, 0).is_err());
    }

    #[test]
    fn test_inflation_with_diagonals() {
        let mut g = grid(7, 7, 1, true);
        let borders = g
            .set_node_kind(GridCoord::new(3, 3), NodeKind::Obstacle, None)
            .unwrap();

        assert_eq!(borders.len(), 8);
        for cell in &borders {
            assert_eq!(cell.chebyshev_distance(&GridCoord::new(3, 3)), 1);
        }
        assert_eq!(g.kind(GridCoord::new(3, 3)), Some(NodeKind::Obstacle));
    }

    #[test]
    fn test_inflation_without_diagonals() {
        let mut g = grid(7, 7, 2, false);
        let borders = g
            .set_node_kind(GridCoord::new(3, 3), NodeKind::Obstacle, None)
            .unwrap();

        // Diamond of radius 2 minus the center
        assert_eq!(borders.len(), 12);
        assert!(!borders.contains(&GridCoord::new(5, 5)));
        assert!(borders.contains(&GridCoord::new(5, 3)));
    }

    #[test]
    fn test_inflation_spares_obstacles_and_protected_cell() {
        let mut g = grid(6, 6, 2, true);
        g.set_node_kind(GridCoord::new(1, 1), NodeKind::Obstacle, None)
            .unwrap();
        let rover = GridCoord::new(3, 1);
        let borders = g
            .set_node_kind(GridCoord::new(2, 2), NodeKind::Obstacle, Some(rover))
            .unwrap();

        assert_eq!(g.kind(GridCoord::new(1, 1)), Some(NodeKind::Obstacle));
        assert_eq!(g.kind(rover), Some(NodeKind::Open));
        assert!(!borders.contains(&rover));
    }

    #[test]
    fn test_no_open_cell_left_near_obstacle() {
        for &diagonals in &[true, false] {
            let mut g = grid(10, 10, 2, diagonals);
            let obstacle = GridCoord::new(0, 9);
            let rover = GridCoord::new(1, 8);
            g.set_node_kind(obstacle, NodeKind::Obstacle, Some(rover))
                .unwrap();

            for y in 0..10 {
                for x in 0..10 {
                    let c = GridCoord::new(x, y);
                    let d = if diagonals {
                        c.chebyshev_distance(&obstacle)
                    } else {
                        c.manhattan_distance(&obstacle)
                    };
                    if d > 0 && d <= 2 && c != rover {
                        assert_eq!(g.kind(c), Some(NodeKind::Border), "{:?}", c);
                    }
                }
            }
        }
    }

    #[test]
    fn test_world_mapping() {
        let g = Grid::new(&GridConfig::default());
        // 2.5m / 20 columns = 0.125m cells
        let c = g.node_from_world(WorldPoint::new(0.13, 0.01)).unwrap();
        assert_eq!(c, GridCoord::new(1, 0));

        let center = g.world_from_node(GridCoord::new(1, 0));
        assert!((center.x - 0.1875).abs() < 1e-6);
        assert!((center.y - 0.0625).abs() < 1e-6);
        assert_eq!(g.node_from_world(center).unwrap(), GridCoord::new(1, 0));

        // Far edge belongs to the last cell
        let edge = g.node_from_world(WorldPoint::new(2.5, 3.5)).unwrap();
        assert_eq!(edge, GridCoord::new(19, 27));
    }

    #[test]
    fn test_out_of_bounds() {
        let g = Grid::new(&GridConfig::default());
        assert!(matches!(
            g.node_from_world(WorldPoint::new(-0.01, 1.0)),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(g.node_from_world(WorldPoint::new(1.0, 3.6)).is_err());
        assert!(g.node_from_world(WorldPoint::new(f32::NAN, 1.0)).is_err());
    }

    #[test]
    fn test_offset_grid() {
        let g = Grid::new(&GridConfig {
            offset_x: -1.0,
            offset_y: 2.0,
            ..GridConfig::default()
        });
        assert_eq!(
            g.node_from_world(WorldPoint::new(-1.0, 2.0)).unwrap(),
            GridCoord::new(0, 0)
        );
        assert!(g.node_from_world(WorldPoint::new(0.0, 0.0)).is_err());
    }
}
