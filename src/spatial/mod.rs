pub mod cell;

pub use cell::PackedCell;

/// Grid coordinate in cells. Signed so that neighbour lookups may step off
/// the map edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl CellPos {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        CellPos { x, y }
    }

    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        CellPos::new(self.x + dx, self.y + dy)
    }
}

/// The four orthogonal neighbours of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// `(rotation, flip_x, flip_y)` that turns a canonical transition image
    /// (blending in from above) so it blends in from this side.
    pub fn orientation(self) -> (f32, bool, bool) {
        use std::f32::consts::FRAC_PI_2;
        match self {
            Direction::Up => (0.0, false, false),
            Direction::Down => (0.0, false, true),
            Direction::Left => (-FRAC_PI_2, false, false),
            Direction::Right => (FRAC_PI_2, false, false),
        }
    }
}
