/// GameSession: one run of the dungeon, from start to return-to-menu.
///
/// Tick processing order:
///   1. Player: invulnerability countdown, then mover
///   2. Enemies: AI decision (cooldown / chase / wander), then mover
///   3. Contact damage (at most one point per tick)
///
/// hp reaching 0 is reported as an event; the state machine decides what
/// happens next. The session never transitions itself.
///
/// Randomness comes from the injected `StdRng` only: spawn placement at
/// start, then every enemy decision.

use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::RulesConfig;
use crate::domain::ai::{AiParams, Decision};
use crate::domain::entity::{ActorView, Direction, Enemy, Player};
use crate::domain::grid::{Grid, GridPos, Level, DEFAULT_SPAWN};
use crate::error::SessionError;
use super::event::GameEvent;

pub struct GameSession {
    grid: Grid,
    rules: RulesConfig,
    ai: AiParams,
    player: Player,
    enemies: Vec<Enemy>,
    rng: StdRng,
    tick: u64,
}

// ══════════════════════════════════════════════════════════════
// Construction
// ══════════════════════════════════════════════════════════════

impl GameSession {
    /// Build a fresh session: player on the level's spawn (or the default
    /// cell), enemies scattered by rejection sampling.
    pub fn start(level: Level, rules: &RulesConfig, mut rng: StdRng) -> Result<Self, SessionError> {
        let grid = Grid::new(level, rules.tile_size);
        let spawn = grid.level().spawn.unwrap_or(DEFAULT_SPAWN);
        if grid.is_blocked(spawn) {
            return Err(SessionError::SpawnBlocked { cell: spawn });
        }

        let cells = place_enemies(
            &grid,
            spawn,
            rules.enemy_count,
            rules.spawn_min_distance,
            rules.spawn_max_attempts,
            &mut rng,
        )?;

        let player = Player::new(&grid, spawn, rules.player_speed, rules.player_hp);
        let enemies: Vec<Enemy> = cells
            .into_iter()
            .enumerate()
            .map(|(id, cell)| Enemy::new(id, &grid, cell, rules.enemy_speed))
            .collect();

        info!(
            "session started on {:?}: player at {:?}, {} enemies",
            grid.level().name,
            spawn,
            enemies.len()
        );

        Ok(GameSession {
            grid,
            rules: rules.clone(),
            ai: rules.ai_params(),
            player,
            enemies,
            rng,
            tick: 0,
        })
    }
}

/// Draw uniformly random interior cells until `count` are found that are
/// free and at least `min_distance` (Manhattan) from `spawn`.
/// Enemies may share a starting cell.
fn place_enemies(
    grid: &Grid,
    spawn: GridPos,
    count: usize,
    min_distance: i32,
    max_attempts: u32,
    rng: &mut StdRng,
) -> Result<Vec<GridPos>, SessionError> {
    if count == 0 {
        return Ok(vec![]);
    }

    let valid = |cell: GridPos| !grid.is_blocked(cell) && cell.manhattan(spawn) >= min_distance;
    if !grid.interior().any(|c| valid(c)) {
        return Err(SessionError::NoSpawnRoom { requested: count, min_distance });
    }

    // A valid interior cell exists, so both ranges are non-empty.
    let max_col = grid.level().cols() as i32 - 2;
    let max_row = grid.level().rows() as i32 - 2;

    let mut placed = Vec::with_capacity(count);
    let mut attempts = 0u32;
    while placed.len() < count {
        if attempts >= max_attempts {
            return Err(SessionError::SpawnAttemptsExhausted {
                placed: placed.len(),
                requested: count,
                attempts,
            });
        }
        attempts += 1;
        let cell = GridPos::new(rng.random_range(1..=max_col), rng.random_range(1..=max_row));
        if valid(cell) {
            debug!("enemy {} spawns at {cell:?} after {attempts} draws", placed.len());
            placed.push(cell);
        }
    }
    Ok(placed)
}

// ══════════════════════════════════════════════════════════════
// Per-tick update
// ══════════════════════════════════════════════════════════════

impl GameSession {
    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        let dt = dt.max(0.0);
        let mut events = Vec::new();
        self.tick += 1;

        self.player.update(dt);
        resolve_enemies(self, dt);
        resolve_contact_damage(self, &mut events);

        events
    }

    /// Player input. Rejected while a move is in flight, into walls, or
    /// once the player is defeated.
    pub fn request_player_move(&mut self, dir: Direction) -> bool {
        if !self.player.is_alive() {
            return false;
        }
        self.player.mover.request_move(&self.grid, dir)
    }

    /// Animation clock, independent of `tick`. Reads mover state only.
    pub fn step_animation(&mut self) {
        self.player.anim.tick(self.player.mover.is_moving());
        for e in &mut self.enemies {
            e.anim.tick(e.mover.is_moving());
        }
    }
}

fn resolve_enemies(session: &mut GameSession, dt: f32) {
    let GameSession { grid, ai, player, enemies, rng, .. } = session;
    let player_cell = player.mover.cell();
    for e in enemies.iter_mut() {
        match e.ai.update(&mut e.mover, grid, player_cell, ai, rng, dt) {
            Decision::Moved(dir) => trace!("enemy {} heads {dir:?}", e.id),
            Decision::Blocked(dir) => trace!("enemy {} blocked going {dir:?}", e.id),
            Decision::Hold | Decision::Wait => {}
        }
    }
}

fn resolve_contact_damage(session: &mut GameSession, events: &mut Vec<GameEvent>) {
    let player_pos = session.player.mover.position();
    let radius = session.rules.contact_radius;
    let grace = session.rules.invulnerability_secs;

    for e in &session.enemies {
        if e.mover.position().distance(player_pos) >= radius {
            continue;
        }
        let was_alive = session.player.is_alive();
        if !session.player.take_hit(grace) {
            // Invulnerable: this and every later contact this tick is ignored.
            break;
        }
        let hp = session.player.hp();
        debug!("enemy {} hit the player at tick {}, hp {hp}", e.id, session.tick);
        if was_alive {
            events.push(GameEvent::PlayerHit { hp });
            if hp == 0 {
                info!("player defeated at tick {}", session.tick);
                events.push(GameEvent::PlayerDefeated);
            }
        }
        break;
    }
}

// ══════════════════════════════════════════════════════════════
// Read-only views
// ══════════════════════════════════════════════════════════════

impl GameSession {
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    /// Starting hp, for the HUD.
    pub fn max_hp(&self) -> u32 {
        self.rules.player_hp
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn is_defeated(&self) -> bool {
        !self.player.is_alive()
    }

    /// Enemies first, player last (draw order).
    pub fn actors(&self) -> Vec<ActorView> {
        let mut out: Vec<ActorView> = self.enemies.iter().map(ActorView::of_enemy).collect();
        out.push(ActorView::of_player(&self.player));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::anim::AnimMode;
    use crate::sim::level::{builtin_level, parse_level};
    use rand::SeedableRng;

    fn level_from(rows: &[&str]) -> Level {
        parse_level(&rows.join("\n")).unwrap()
    }

    /// Session with hand-placed actors. Enemies with speed 0 never leave their cell.
    fn session_with(rows: &[&str], player: GridPos, enemies: &[GridPos], enemy_speed: f32) -> GameSession {
        let rules = RulesConfig { enemy_count: enemies.len(), enemy_speed, ..RulesConfig::default() };
        let grid = Grid::new(level_from(rows), rules.tile_size);
        let p = Player::new(&grid, player, rules.player_speed, rules.player_hp);
        let es = enemies
            .iter()
            .enumerate()
            .map(|(id, &c)| Enemy::new(id, &grid, c, enemy_speed))
            .collect();
        GameSession {
            ai: rules.ai_params(),
            rules,
            grid,
            player: p,
            enemies: es,
            rng: StdRng::seed_from_u64(0),
            tick: 0,
        }
    }

    const ROOM: &[&str] = &[
        "########",
        "#......#",
        "#......#",
        "#......#",
        "########",
    ];

    // ── Spawning ──

    #[test]
    fn start_places_player_and_enemies() {
        let s = GameSession::start(builtin_level(), &RulesConfig::default(), StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(s.player().hp(), 5);
        assert_eq!(s.player().mover.cell(), GridPos::new(1, 1));
        assert_eq!(s.enemies().len(), 4);
        assert!(!s.is_defeated());
    }

    #[test]
    fn spawns_are_free_and_far_from_player() {
        let rules = RulesConfig::default();
        for seed in 0..100 {
            let s = GameSession::start(builtin_level(), &rules, StdRng::seed_from_u64(seed)).unwrap();
            let spawn = s.player().mover.cell();
            for e in s.enemies() {
                let c = e.mover.cell();
                assert!(!s.grid().is_blocked(c), "seed {seed}: enemy on wall {c:?}");
                assert!(c.manhattan(spawn) >= 4, "seed {seed}: enemy too close {c:?}");
                assert!(c.col >= 1 && c.col <= 8 && c.row >= 1 && c.row <= 6);
            }
        }
    }

    #[test]
    fn same_seed_same_session() {
        let rules = RulesConfig::default();
        let mut a = GameSession::start(builtin_level(), &rules, StdRng::seed_from_u64(9)).unwrap();
        let mut b = GameSession::start(builtin_level(), &rules, StdRng::seed_from_u64(9)).unwrap();
        for _ in 0..300 {
            a.tick(0.016);
            b.tick(0.016);
        }
        let pa: Vec<_> = a.enemies().iter().map(|e| e.mover.position()).collect();
        let pb: Vec<_> = b.enemies().iter().map(|e| e.mover.position()).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn cramped_level_is_a_construction_error() {
        let level = level_from(&[
            "#####",
            "#P..#",
            "#####",
        ]);
        let err = GameSession::start(level, &RulesConfig::default(), StdRng::seed_from_u64(0)).err();
        assert!(matches!(err, Some(SessionError::NoSpawnRoom { requested: 4, min_distance: 4 })));
    }

    #[test]
    fn attempt_budget_is_enforced() {
        let rules = RulesConfig { spawn_max_attempts: 0, ..RulesConfig::default() };
        let err = GameSession::start(builtin_level(), &rules, StdRng::seed_from_u64(0)).err();
        assert!(matches!(
            err,
            Some(SessionError::SpawnAttemptsExhausted { placed: 0, requested: 4, attempts: 0 })
        ));
    }

    #[test]
    fn blocked_default_spawn_is_rejected() {
        let level = level_from(&[
            "#####",
            "##..#",
            "#...#",
            "#####",
        ]);
        let err = GameSession::start(level, &RulesConfig::default(), StdRng::seed_from_u64(0)).err();
        assert!(matches!(err, Some(SessionError::SpawnBlocked { cell }) if cell == GridPos::new(1, 1)));
    }

    #[test]
    fn zero_enemies_fit_anywhere() {
        let rules = RulesConfig { enemy_count: 0, ..RulesConfig::default() };
        let s = GameSession::start(level_from(&["P."]), &rules, StdRng::seed_from_u64(0)).unwrap();
        assert!(s.enemies().is_empty());
        assert_eq!(s.player().mover.cell(), GridPos::new(0, 0));
    }

    // ── Damage ──

    #[test]
    fn contact_then_grace_window() {
        let mut s = session_with(ROOM, GridPos::new(2, 2), &[GridPos::new(2, 2)], 180.0);
        let events = s.tick(0.016);
        assert_eq!(events, vec![GameEvent::PlayerHit { hp: 4 }]);
        assert_eq!(s.player().hp(), 4);
        assert_eq!(s.player().invulnerable_remaining(), 0.6);

        let events = s.tick(0.1);
        assert!(events.is_empty());
        assert_eq!(s.player().hp(), 4);
    }

    #[test]
    fn simultaneous_contacts_deal_one_point() {
        let cell = GridPos::new(3, 2);
        let mut s = session_with(ROOM, cell, &[cell, cell, cell], 0.0);
        let events = s.tick(0.016);
        assert_eq!(events.len(), 1);
        assert_eq!(s.player().hp(), 4);
    }

    #[test]
    fn one_point_per_tick_even_without_grace() {
        let cell = GridPos::new(3, 2);
        let mut s = session_with(ROOM, cell, &[cell, cell], 0.0);
        s.rules.invulnerability_secs = 0.0;
        s.tick(0.016);
        assert_eq!(s.player().hp(), 4);
        s.tick(0.016);
        assert_eq!(s.player().hp(), 3);
    }

    #[test]
    fn far_enemy_does_no_damage() {
        let mut s = session_with(ROOM, GridPos::new(1, 1), &[GridPos::new(6, 3)], 0.0);
        for _ in 0..100 {
            assert!(s.tick(0.05).is_empty());
        }
        assert_eq!(s.player().hp(), 5);
    }

    #[test]
    fn hp_only_falls_and_stops_at_zero() {
        let cell = GridPos::new(2, 1);
        let mut s = session_with(ROOM, cell, &[cell], 0.0);
        let mut last = s.player().hp();
        let mut defeats = 0;
        for _ in 0..400 {
            for ev in s.tick(0.05) {
                if ev == GameEvent::PlayerDefeated {
                    defeats += 1;
                }
            }
            let hp = s.player().hp();
            assert!(hp <= last);
            assert!(s.player().invulnerable_remaining() >= 0.0);
            last = hp;
        }
        assert_eq!(s.player().hp(), 0);
        assert!(s.is_defeated());
        assert_eq!(defeats, 1);
    }

    #[test]
    fn defeated_player_cannot_move() {
        let cell = GridPos::new(2, 2);
        let mut s = session_with(ROOM, cell, &[cell], 0.0);
        s.rules.invulnerability_secs = 0.0;
        for _ in 0..5 {
            s.tick(0.016);
        }
        assert!(s.is_defeated());
        assert!(!s.request_player_move(Direction::Right));
        assert_eq!(s.player().mover.cell(), cell);
    }

    // ── Movement + animation ──

    #[test]
    fn player_moves_one_cell() {
        let mut s = session_with(ROOM, GridPos::new(1, 1), &[], 0.0);
        assert!(s.request_player_move(Direction::Right));
        assert!(!s.request_player_move(Direction::Right));
        s.tick(1.0);
        assert_eq!(s.player().mover.position(), s.grid().cell_center(GridPos::new(2, 1)));
        assert!(!s.player().mover.is_moving());
        assert!(!s.request_player_move(Direction::Up)); // wall
    }

    #[test]
    fn enemies_stay_on_grid_lines() {
        let mut s = GameSession::start(builtin_level(), &RulesConfig::default(), StdRng::seed_from_u64(4)).unwrap();
        for _ in 0..600 {
            s.tick(0.016);
            for e in s.enemies() {
                let p = e.mover.position();
                let t = e.mover.target();
                assert!(p.x == t.x || p.y == t.y, "enemy {} left the grid line", e.id);
                assert!(!s.grid().is_blocked(e.mover.cell()));
            }
        }
    }

    #[test]
    fn animation_follows_mover_state() {
        let mut s = session_with(ROOM, GridPos::new(1, 1), &[GridPos::new(5, 3)], 0.0);
        s.step_animation();
        assert_eq!(s.player().anim.mode(), AnimMode::Idle);

        assert!(s.request_player_move(Direction::Down));
        s.step_animation();
        assert_eq!(s.player().anim.mode(), AnimMode::Walk);
        let before = s.player().mover.position();
        s.step_animation();
        assert_eq!(s.player().mover.position(), before, "animation must not move actors");
    }

    #[test]
    fn actor_views_end_with_player() {
        let s = session_with(ROOM, GridPos::new(1, 1), &[GridPos::new(5, 3), GridPos::new(6, 3)], 0.0);
        let views = s.actors();
        assert_eq!(views.len(), 3);
        assert_eq!(views[2].hp, Some(5));
        assert_eq!(views[0].cell, GridPos::new(5, 3));
    }
}
