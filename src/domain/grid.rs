/// Grid coordinate system: integer cells ↔ pixel-space centers.
///
/// Two coordinate spaces:
///   - `GridPos`: integer `(col, row)` cell address
///   - `Vec2`:    continuous `(x, y)` in the same space as pixel centers
///
/// `Grid` pairs the static level layout with the tile size and is the
/// single source of truth for "can an actor enter this cell?".

use super::entity::Direction;
use super::tile::Cell;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct GridPos {
    pub col: i32,
    pub row: i32,
}

impl GridPos {
    pub const fn new(col: i32, row: i32) -> Self {
        GridPos { col, row }
    }

    /// Neighbouring cell one step in `dir`. No bounds check.
    pub fn step(self, dir: Direction) -> GridPos {
        let (dc, dr) = dir.offset();
        GridPos { col: self.col + dc, row: self.row + dr }
    }

    pub fn manhattan(self, other: GridPos) -> i32 {
        (self.col - other.col).abs() + (self.row - other.row).abs()
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

/// Static level layout. Rectangular, fixed at load time.
#[derive(Clone, Debug)]
pub struct Level {
    pub name: String,
    cells: Vec<Vec<Cell>>,
    cols: usize,
    rows: usize,
    /// Spawn marker from the layout, if it had one.
    pub spawn: Option<GridPos>,
}

impl Level {
    /// Build a level from validated rows. Callers guarantee every row has the same width.
    pub(crate) fn new(name: String, cells: Vec<Vec<Cell>>, spawn: Option<GridPos>) -> Self {
        let rows = cells.len();
        let cols = cells.first().map_or(0, |r| r.len());
        Level { name, cells, cols, rows, spawn }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Cell at `pos`, or `None` outside the level.
    #[inline]
    pub fn cell(&self, pos: GridPos) -> Option<Cell> {
        if pos.col < 0 || pos.row < 0 {
            return None;
        }
        self.cells
            .get(pos.row as usize)
            .and_then(|row| row.get(pos.col as usize))
            .copied()
    }
}

/// Cell used when neither the layout nor the caller names a spawn.
pub const DEFAULT_SPAWN: GridPos = GridPos::new(1, 1);

#[derive(Clone, Debug)]
pub struct Grid {
    level: Level,
    tile_size: i32,
}

impl Grid {
    pub fn new(level: Level, tile_size: i32) -> Self {
        Grid { level, tile_size }
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn tile_size(&self) -> i32 {
        self.tile_size
    }

    /// Pixel-space center of a cell: `col * TILE + TILE / 2` (integer half tile).
    pub fn cell_center(&self, pos: GridPos) -> Vec2 {
        let half = self.tile_size / 2;
        Vec2 {
            x: (pos.col * self.tile_size + half) as f32,
            y: (pos.row * self.tile_size + half) as f32,
        }
    }

    /// Out of bounds counts as wall.
    #[inline]
    pub fn is_blocked(&self, pos: GridPos) -> bool {
        self.level.cell(pos).map_or(true, Cell::is_blocking)
    }

    /// Interior cells (one-cell border excluded), row-major.
    /// Empty when the level is narrower or shorter than three cells.
    pub fn interior(&self) -> impl Iterator<Item = GridPos> + '_ {
        let cols = self.level.cols as i32;
        let rows = self.level.rows as i32;
        (1..rows - 1).flat_map(move |row| (1..cols - 1).map(move |col| GridPos::new(col, row)))
    }
}
