//! Tile grid addressing: integer cells, compass directions, pixel geometry.
//!
//! Everything here is pure. A `GridCoordinate` is an integer cell; the
//! `GridGeometry` maps cells to the continuous view plane using a single
//! square cell edge length.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Relation;

/// Integer cell address on the infinite grid. `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridCoordinate {
    pub x: i32,
    pub y: i32,
}

impl GridCoordinate {
    pub const ORIGIN: GridCoordinate = GridCoordinate { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell one step in `dir`.
    pub fn neighbor(self, dir: Direction) -> Self {
        self.offset(dir, 1)
    }

    /// The cell `distance` steps away in `dir`.
    ///
    /// Arithmetic wraps, so `c.offset(d, n).offset(d.opposite(), n) == c`
    /// holds for every coordinate, including the extremes.
    pub fn offset(self, dir: Direction, distance: i32) -> Self {
        let (dx, dy) = dir.unit();
        Self {
            x: self.x.wrapping_add(dx.wrapping_mul(distance)),
            y: self.y.wrapping_add(dy.wrapping_mul(distance)),
        }
    }

    /// The four cardinal neighbors, in `Direction::ALL` order.
    pub fn neighbors(self) -> [GridCoordinate; 4] {
        Direction::ALL.map(|d| self.neighbor(d))
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for GridCoordinate {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Compass direction on the grid.
///
/// Each direction doubles as the kind of follow-up thought it produces,
/// see [`Direction::relation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit displacement. Horizontal directions move along x, vertical along y.
    pub const fn unit(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// The only relation an expansion in this direction may carry.
    pub const fn relation(self) -> Relation {
        match self {
            Direction::Right => Relation::Time,
            Direction::Up => Relation::Summary,
            Direction::Down => Relation::Detail,
            Direction::Left => Relation::Contrast,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Continuous view-plane position (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPosition {
    pub x: f64,
    pub y: f64,
}

impl PixelPosition {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle covered by one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub origin: PixelPosition,
    pub size: f64,
}

impl PixelRect {
    pub fn contains(&self, p: PixelPosition) -> bool {
        p.x >= self.origin.x
            && p.y >= self.origin.y
            && p.x < self.origin.x + self.size
            && p.y < self.origin.y + self.size
    }
}

/// Maps grid cells to pixel space with one square cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    cell_size: f64,
}

impl GridGeometry {
    /// `cell_size` must be positive and finite; `EngineConfig::validate`
    /// checks this before a geometry is built from configuration.
    pub const fn new(cell_size: f64) -> Self {
        Self { cell_size }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Top-left corner of the cell.
    pub fn to_pixel(&self, c: GridCoordinate) -> PixelPosition {
        PixelPosition {
            x: f64::from(c.x) * self.cell_size,
            y: f64::from(c.y) * self.cell_size,
        }
    }

    /// Center of the cell.
    pub fn center(&self, c: GridCoordinate) -> PixelPosition {
        let half = self.cell_size / 2.0;
        let p = self.to_pixel(c);
        PixelPosition { x: p.x + half, y: p.y + half }
    }

    /// The cell containing `p`. Cells are half-open: `[x, x + size)`.
    pub fn to_grid(&self, p: PixelPosition) -> GridCoordinate {
        GridCoordinate {
            x: (p.x / self.cell_size).floor() as i32,
            y: (p.y / self.cell_size).floor() as i32,
        }
    }

    pub fn cell_rect(&self, c: GridCoordinate) -> PixelRect {
        PixelRect { origin: self.to_pixel(c), size: self.cell_size }
    }
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self::new(400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn direction() -> impl Strategy<Value = Direction> {
        prop::sample::select(Direction::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn neighbor_round_trip(x in any::<i32>(), y in any::<i32>(), d in direction()) {
            let c = GridCoordinate::new(x, y);
            prop_assert_eq!(c.neighbor(d).neighbor(d.opposite()), c);
        }

        #[test]
        fn offset_round_trip(x in any::<i32>(), y in any::<i32>(), d in direction(), n in 1i32..1000) {
            let c = GridCoordinate::new(x, y);
            prop_assert_eq!(c.offset(d, n).offset(d.opposite(), n), c);
        }

        #[test]
        fn pixel_round_trip(x in -100_000i32..100_000, y in -100_000i32..100_000) {
            let g = GridGeometry::new(400.0);
            let c = GridCoordinate::new(x, y);
            prop_assert_eq!(g.to_grid(g.to_pixel(c)), c);
            prop_assert_eq!(g.to_grid(g.center(c)), c);
        }
    }

    #[test]
    fn test_directions_move_on_one_axis() {
        let c = GridCoordinate::ORIGIN;
        assert_eq!(c.neighbor(Direction::Right), GridCoordinate::new(1, 0));
        assert_eq!(c.neighbor(Direction::Left), GridCoordinate::new(-1, 0));
        assert_eq!(c.neighbor(Direction::Up), GridCoordinate::new(0, -1));
        assert_eq!(c.neighbor(Direction::Down), GridCoordinate::new(0, 1));
    }

    #[test]
    fn test_direction_relation_table() {
        assert_eq!(Direction::Right.relation(), Relation::Time);
        assert_eq!(Direction::Up.relation(), Relation::Summary);
        assert_eq!(Direction::Down.relation(), Relation::Detail);
        assert_eq!(Direction::Left.relation(), Relation::Contrast);
    }

    #[test]
    fn test_negative_pixels_floor_into_cell() {
        let g = GridGeometry::new(400.0);
        assert_eq!(g.to_grid(PixelPosition::new(-1.0, -399.5)), GridCoordinate::new(-1, -1));
        assert!(g.cell_rect(GridCoordinate::new(-1, 0)).contains(PixelPosition::new(-0.5, 10.0)));
    }
}
