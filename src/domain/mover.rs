/// Per-actor motion engine: cell position + smooth interpolation toward
/// the target cell's center.
///
/// Invariants:
///   - `target` is always `grid.cell_center(cell)`
///   - `moving == (current != target)`
///   - at most one move in flight; requests while moving are rejected

use super::entity::Direction;
use super::grid::{Grid, GridPos, Vec2};

#[derive(Clone, Debug)]
pub struct Mover {
    cell: GridPos,
    current: Vec2,
    target: Vec2,
    speed: f32,
    moving: bool,
}

impl Mover {
    /// Place a mover at rest on the center of `cell`.
    pub fn new(grid: &Grid, cell: GridPos, speed: f32) -> Self {
        let center = grid.cell_center(cell);
        Mover { cell, current: center, target: center, speed, moving: false }
    }

    pub fn cell(&self) -> GridPos {
        self.cell
    }

    pub fn position(&self) -> Vec2 {
        self.current
    }

    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    /// Start a one-cell move. Returns false (and changes nothing) if a move
    /// is already in flight or the destination is blocked.
    pub fn request_move(&mut self, grid: &Grid, dir: Direction) -> bool {
        if self.moving {
            return false;
        }
        let next = self.cell.step(dir);
        if grid.is_blocked(next) {
            return false;
        }
        self.cell = next;
        self.target = grid.cell_center(next);
        self.moving = true;
        true
    }

    /// Advance toward the target by `speed * dt`, snapping when the
    /// remaining distance fits in one step (no overshoot).
    pub fn advance(&mut self, dt: f32) {
        if !self.moving {
            return;
        }
        let delta = self.target - self.current;
        let dist = delta.length();
        let step = self.speed * dt;
        if dist <= step {
            self.current = self.target;
            self.moving = false;
        } else {
            self.current.x += delta.x / dist * step;
            self.current.y += delta.y / dist * step;
        }
    }
}
