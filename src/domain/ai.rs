/// Enemy AI: greedy single-axis pursuit mixed with random wandering.
///
/// Each tick the decision cooldown counts down. Once it has expired and the
/// enemy is standing still, a new direction is chosen:
///   1. **Chase** (probability `chase_probability`): step toward the player.
///      If both axes differ, one axis is picked 50/50 and the other zeroed.
///   2. **Wander**: one of the four cardinal directions, uniformly.
///
/// A blocked move is not retried; the enemy idles until the next expiry.
/// The mover is advanced every tick regardless of the decision.

use rand::Rng;

use super::entity::Direction;
use super::grid::{Grid, GridPos};
use super::mover::Mover;

/// Tuning for the decision policy.
#[derive(Clone, Debug)]
pub struct AiParams {
    pub cooldown_min: f32,
    pub cooldown_max: f32,
    pub chase_probability: f64,
}

impl Default for AiParams {
    fn default() -> Self {
        AiParams { cooldown_min: 0.35, cooldown_max: 0.55, chase_probability: 0.55 }
    }
}

/// What happened on one AI update.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Decision {
    /// Cooldown still running or a move is in flight.
    Wait,
    /// Decided, but pursuit gave a zero offset (already on the player's cell).
    Hold,
    Moved(Direction),
    Blocked(Direction),
}

#[derive(Clone, Debug, Default)]
pub struct AiController {
    decision_cooldown: f32,
}

impl AiController {
    /// Starts expired, so the first tick decides.
    pub fn new() -> Self {
        AiController { decision_cooldown: 0.0 }
    }

    pub fn decision_cooldown(&self) -> f32 {
        self.decision_cooldown
    }

    pub fn update<R: Rng>(
        &mut self,
        mover: &mut Mover,
        grid: &Grid,
        player_cell: GridPos,
        params: &AiParams,
        rng: &mut R,
        dt: f32,
    ) -> Decision {
        self.decision_cooldown -= dt;

        let decision = if !mover.is_moving() && self.decision_cooldown <= 0.0 {
            self.decision_cooldown = roll_cooldown(params, rng);
            match choose_direction(mover.cell(), player_cell, params, rng) {
                Some(dir) if mover.request_move(grid, dir) => Decision::Moved(dir),
                Some(dir) => Decision::Blocked(dir),
                None => Decision::Hold,
            }
        } else {
            Decision::Wait
        };

        mover.advance(dt);
        decision
    }
}

/// Uniform in `[min, max)`; a degenerate range yields `min`.
fn roll_cooldown<R: Rng>(params: &AiParams, rng: &mut R) -> f32 {
    if params.cooldown_max > params.cooldown_min {
        rng.random_range(params.cooldown_min..params.cooldown_max)
    } else {
        params.cooldown_min
    }
}

pub fn choose_direction<R: Rng>(
    from: GridPos,
    player: GridPos,
    params: &AiParams,
    rng: &mut R,
) -> Option<Direction> {
    if rng.random_bool(params.chase_probability) {
        chase_direction(from, player, rng)
    } else {
        Some(Direction::ALL[rng.random_range(0..Direction::ALL.len())])
    }
}

/// Signed unit step toward the player on a single axis.
pub fn chase_direction<R: Rng>(from: GridPos, player: GridPos, rng: &mut R) -> Option<Direction> {
    let mut dc = (player.col - from.col).signum();
    let mut dr = (player.row - from.row).signum();
    if dc != 0 && dr != 0 {
        if rng.random_bool(0.5) {
            dr = 0;
        } else {
            dc = 0;
        }
    }
    Direction::from_offset(dc, dr)
}
