/// Entities: Player and Enemy, composed from a shared `Mover` and
/// `AnimationState`. Each variant carries its own behavior fields and has
/// its own update function; nothing dispatches through a trait object.

use super::ai::AiController;
use super::anim::{AnimMode, AnimationState, FrameSet, HERO_FRAMES, SLIME_FRAMES};
use super::grid::{Grid, GridPos, Vec2};
use super::mover::Mover;

/// Cardinal movement direction. Diagonals are unrepresentable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Right, Direction::Left, Direction::Down, Direction::Up];

    /// `(d_col, d_row)` unit offset.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }

    /// Inverse of `offset`. `None` for zero or diagonal offsets.
    pub fn from_offset(d_col: i32, d_row: i32) -> Option<Direction> {
        match (d_col.signum(), d_row.signum()) {
            (-1, 0) => Some(Direction::Left),
            (1, 0) => Some(Direction::Right),
            (0, -1) => Some(Direction::Up),
            (0, 1) => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Which sprite family an actor uses. Renderers key their glyphs on this.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ActorKind {
    Hero,
    Slime,
}

impl ActorKind {
    pub fn frames(self) -> FrameSet {
        match self {
            ActorKind::Hero => HERO_FRAMES,
            ActorKind::Slime => SLIME_FRAMES,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub mover: Mover,
    pub anim: AnimationState,
    hp: u32,
    invulnerable_remaining: f32,
}

impl Player {
    pub fn new(grid: &Grid, cell: GridPos, speed: f32, hp: u32) -> Self {
        Player {
            mover: Mover::new(grid, cell, speed),
            anim: AnimationState::new(ActorKind::Hero.frames()),
            hp,
            invulnerable_remaining: 0.0,
        }
    }

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn invulnerable_remaining(&self) -> f32 {
        self.invulnerable_remaining
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_remaining > 0.0
    }

    /// Count down the grace window; never goes negative.
    pub fn tick_invulnerability(&mut self, dt: f32) {
        self.invulnerable_remaining = (self.invulnerable_remaining - dt).max(0.0);
    }

    /// Apply one point of damage unless invulnerable.
    /// Returns true if the hit landed.
    pub fn take_hit(&mut self, grace_window: f32) -> bool {
        if self.is_invulnerable() {
            return false;
        }
        self.hp = self.hp.saturating_sub(1);
        self.invulnerable_remaining = grace_window;
        true
    }

    pub fn update(&mut self, dt: f32) {
        self.tick_invulnerability(dt);
        self.mover.advance(dt);
    }
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: usize,
    pub mover: Mover,
    pub anim: AnimationState,
    pub ai: AiController,
}

impl Enemy {
    pub fn new(id: usize, grid: &Grid, cell: GridPos, speed: f32) -> Self {
        Enemy {
            id,
            mover: Mover::new(grid, cell, speed),
            anim: AnimationState::new(ActorKind::Slime.frames()),
            ai: AiController::new(),
        }
    }
}

/// Read-only snapshot of an actor for the renderer.
#[derive(Clone, Copy, Debug)]
pub struct ActorView {
    pub kind: ActorKind,
    pub cell: GridPos,
    pub position: Vec2,
    pub mode: AnimMode,
    pub frame: usize,
    pub frame_name: &'static str,
    /// Only the player has health.
    pub hp: Option<u32>,
    pub invulnerable: bool,
}

impl ActorView {
    pub fn of_player(p: &Player) -> Self {
        ActorView {
            kind: ActorKind::Hero,
            cell: p.mover.cell(),
            position: p.mover.position(),
            mode: p.anim.mode(),
            frame: p.anim.frame_index(),
            frame_name: p.anim.frame_name(),
            hp: Some(p.hp),
            invulnerable: p.is_invulnerable(),
        }
    }

    pub fn of_enemy(e: &Enemy) -> Self {
        ActorView {
            kind: ActorKind::Slime,
            cell: e.mover.cell(),
            position: e.mover.position(),
            mode: e.anim.mode(),
            frame: e.anim.frame_index(),
            frame_name: e.anim.frame_name(),
            hp: None,
            invulnerable: false,
        }
    }
}
