/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use log::warn;
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::ai::AiParams;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub rules: RulesConfig,
    pub timing: TimingConfig,
    pub gamepad: GamepadConfig,
    pub level_file: Option<PathBuf>,
    pub seed: Option<u64>,
}

/// Everything a session is constructed from, apart from the level itself.
#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub tile_size: i32,
    pub player_hp: u32,
    pub player_speed: f32,
    pub invulnerability_secs: f32, // grace window after a hit
    pub enemy_count: usize,
    pub enemy_speed: f32,
    pub decision_cooldown_min: f32,
    pub decision_cooldown_max: f32,
    pub chase_probability: f64,
    pub spawn_min_distance: i32,   // Manhattan cells from the player spawn
    pub spawn_max_attempts: u32,
    pub contact_radius: f32,       // pixel-space, between continuous positions
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub frame_ms: u64,
    pub animation_ms: u64,
    pub max_dt_ms: u64,   // cap on a single physics dt after a stall
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            tile_size: default_tile_size(),
            player_hp: default_player_hp(),
            player_speed: default_player_speed(),
            invulnerability_secs: default_invulnerability(),
            enemy_count: default_enemy_count(),
            enemy_speed: default_enemy_speed(),
            decision_cooldown_min: default_cooldown_min(),
            decision_cooldown_max: default_cooldown_max(),
            chase_probability: default_chase_probability(),
            spawn_min_distance: default_spawn_min_distance(),
            spawn_max_attempts: default_spawn_max_attempts(),
            contact_radius: default_contact_radius(),
        }
    }
}

/// Largest tile edge accepted from config; keeps pixel centers well inside i32.
const MAX_TILE_SIZE: i32 = 4096;

impl RulesConfig {
    pub fn ai_params(&self) -> AiParams {
        AiParams {
            cooldown_min: self.decision_cooldown_min,
            cooldown_max: self.decision_cooldown_max,
            chase_probability: self.chase_probability,
        }
    }

    /// Replace values the simulation cannot run with, logging each fix.
    pub fn sanitized(mut self) -> Self {
        if !(1..=MAX_TILE_SIZE).contains(&self.tile_size) {
            warn!("tile_size {} outside [1, {MAX_TILE_SIZE}], using {}", self.tile_size, default_tile_size());
            self.tile_size = default_tile_size();
        }
        if !(self.player_speed > 0.0 && self.player_speed.is_finite()) {
            warn!("player speed {} is not positive and finite, using {}", self.player_speed, default_player_speed());
            self.player_speed = default_player_speed();
        }
        if !(self.enemy_speed > 0.0 && self.enemy_speed.is_finite()) {
            warn!("enemy speed {} is not positive and finite, using {}", self.enemy_speed, default_enemy_speed());
            self.enemy_speed = default_enemy_speed();
        }
        if !(self.invulnerability_secs >= 0.0 && self.invulnerability_secs.is_finite()) {
            warn!("invulnerability_secs {} is negative or infinite, using 0", self.invulnerability_secs);
            self.invulnerability_secs = 0.0;
        }
        if !(self.contact_radius >= 0.0 && self.contact_radius.is_finite()) {
            warn!("contact_radius {} is negative or infinite, using {}", self.contact_radius, default_contact_radius());
            self.contact_radius = default_contact_radius();
        }
        if !(0.0..=1.0).contains(&self.chase_probability) {
            let clamped = if self.chase_probability.is_nan() { default_chase_probability() } else { self.chase_probability.clamp(0.0, 1.0) };
            warn!("chase_probability {} outside [0, 1], using {clamped}", self.chase_probability);
            self.chase_probability = clamped;
        }
        let cooldown_ok = self.decision_cooldown_min >= 0.0
            && self.decision_cooldown_max.is_finite()
            && self.decision_cooldown_max >= self.decision_cooldown_min;
        if !cooldown_ok {
            warn!(
                "decision cooldown range [{}, {}) is invalid, using [{}, {})",
                self.decision_cooldown_min, self.decision_cooldown_max,
                default_cooldown_min(), default_cooldown_max(),
            );
            self.decision_cooldown_min = default_cooldown_min();
            self.decision_cooldown_max = default_cooldown_max();
        }
        if self.player_hp == 0 {
            warn!("player hp 0 would start defeated, using {}", default_player_hp());
            self.player_hp = default_player_hp();
        }
        self
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    grid: TomlGrid,
    #[serde(default)]
    player: TomlPlayer,
    #[serde(default)]
    enemy: TomlEnemy,
    #[serde(default)]
    session: TomlSession,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlGrid {
    #[serde(default = "default_tile_size")]
    tile_size: i32,
}

#[derive(Deserialize, Debug)]
struct TomlPlayer {
    #[serde(default = "default_player_hp")]
    hp: u32,
    #[serde(default = "default_player_speed")]
    speed: f32,
    #[serde(default = "default_invulnerability")]
    invulnerability_secs: f32,
}

#[derive(Deserialize, Debug)]
struct TomlEnemy {
    #[serde(default = "default_enemy_count")]
    count: usize,
    #[serde(default = "default_enemy_speed")]
    speed: f32,
    #[serde(default = "default_cooldown_min")]
    decision_cooldown_min: f32,
    #[serde(default = "default_cooldown_max")]
    decision_cooldown_max: f32,
    #[serde(default = "default_chase_probability")]
    chase_probability: f64,
    #[serde(default = "default_spawn_min_distance")]
    spawn_min_distance: i32,
}

#[derive(Deserialize, Debug)]
struct TomlSession {
    #[serde(default = "default_contact_radius")]
    contact_radius: f32,
    #[serde(default = "default_spawn_max_attempts")]
    spawn_max_attempts: u32,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
    #[serde(default = "default_animation_ms")]
    animation_ms: u64,
    #[serde(default = "default_max_dt_ms")]
    max_dt_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGeneral {
    #[serde(default)]
    level_file: Option<String>,
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_tile_size() -> i32 { 64 }
fn default_player_hp() -> u32 { 5 }
fn default_player_speed() -> f32 { 260.0 }
fn default_invulnerability() -> f32 { 0.6 }
fn default_enemy_count() -> usize { 4 }
fn default_enemy_speed() -> f32 { 180.0 }
fn default_cooldown_min() -> f32 { 0.35 }
fn default_cooldown_max() -> f32 { 0.55 }
fn default_chase_probability() -> f64 { 0.55 }
fn default_spawn_min_distance() -> i32 { 4 }
fn default_spawn_max_attempts() -> u32 { 10_000 }
fn default_contact_radius() -> f32 { 28.0 }
fn default_frame_ms() -> u64 { 16 }
fn default_animation_ms() -> u64 { 150 }  // ~6.7 Hz
fn default_max_dt_ms() -> u64 { 100 }

fn default_confirm() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into(), "B".into()] }

impl Default for TomlGrid {
    fn default() -> Self {
        TomlGrid { tile_size: default_tile_size() }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        TomlPlayer {
            hp: default_player_hp(),
            speed: default_player_speed(),
            invulnerability_secs: default_invulnerability(),
        }
    }
}

impl Default for TomlEnemy {
    fn default() -> Self {
        TomlEnemy {
            count: default_enemy_count(),
            speed: default_enemy_speed(),
            decision_cooldown_min: default_cooldown_min(),
            decision_cooldown_max: default_cooldown_max(),
            chase_probability: default_chase_probability(),
            spawn_min_distance: default_spawn_min_distance(),
        }
    }
}

impl Default for TomlSession {
    fn default() -> Self {
        TomlSession {
            contact_radius: default_contact_radius(),
            spawn_max_attempts: default_spawn_max_attempts(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            frame_ms: default_frame_ms(),
            animation_ms: default_animation_ms(),
            max_dt_ms: default_max_dt_ms(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) ~/.local/share/gridcrawl.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Relative level paths resolve against the first search dir that has them
        let level_file = toml_cfg.general.level_file.map(|name| {
            let path = PathBuf::from(&name);
            if path.is_absolute() {
                path
            } else {
                search_dirs.iter()
                    .map(|d| d.join(&name))
                    .find(|p| p.is_file())
                    .unwrap_or(path)
            }
        });

        let rules = RulesConfig {
            tile_size: toml_cfg.grid.tile_size,
            player_hp: toml_cfg.player.hp,
            player_speed: toml_cfg.player.speed,
            invulnerability_secs: toml_cfg.player.invulnerability_secs,
            enemy_count: toml_cfg.enemy.count,
            enemy_speed: toml_cfg.enemy.speed,
            decision_cooldown_min: toml_cfg.enemy.decision_cooldown_min,
            decision_cooldown_max: toml_cfg.enemy.decision_cooldown_max,
            chase_probability: toml_cfg.enemy.chase_probability,
            spawn_min_distance: toml_cfg.enemy.spawn_min_distance,
            spawn_max_attempts: toml_cfg.session.spawn_max_attempts,
            contact_radius: toml_cfg.session.contact_radius,
        };

        GameConfig {
            rules: rules.sanitized(),
            timing: TimingConfig {
                frame_ms: toml_cfg.timing.frame_ms.max(1),
                animation_ms: toml_cfg.timing.animation_ms.max(1),
                max_dt_ms: toml_cfg.timing.max_dt_ms.max(1),
            },
            gamepad: GamepadConfig {
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            level_file,
            seed: toml_cfg.general.seed,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

/// Candidate directories to search: exe dir + CWD + XDG data dir (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable (symlinks resolved)
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/gridcrawl)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/gridcrawl");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> GameConfig {
        let cfg: TomlConfig = toml::from_str(text).unwrap();
        GameConfig::from_toml(cfg, &[])
    }

    #[test]
    fn empty_file_gives_defaults() {
        let c = parse("");
        assert_eq!(c.rules.tile_size, 64);
        assert_eq!(c.rules.player_hp, 5);
        assert_eq!(c.rules.player_speed, 260.0);
        assert_eq!(c.rules.enemy_speed, 180.0);
        assert_eq!(c.rules.enemy_count, 4);
        assert_eq!(c.rules.contact_radius, 28.0);
        assert_eq!(c.rules.invulnerability_secs, 0.6);
        assert_eq!(c.timing.animation_ms, 150);
        assert!(c.level_file.is_none());
        assert!(c.seed.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let c = parse(
            "[enemy]\ncount = 7\n\n[general]\nseed = 42\nlevel_file = \"/tmp/crypt.txt\"\n",
        );
        assert_eq!(c.rules.enemy_count, 7);
        assert_eq!(c.rules.enemy_speed, 180.0);
        assert_eq!(c.seed, Some(42));
        assert_eq!(c.level_file, Some(PathBuf::from("/tmp/crypt.txt")));
    }

    #[test]
    fn bad_rule_values_are_replaced() {
        let rules = RulesConfig {
            tile_size: 0,
            player_speed: -1.0,
            chase_probability: 1.5,
            decision_cooldown_min: 0.6,
            decision_cooldown_max: 0.2,
            contact_radius: -3.0,
            player_hp: 0,
            ..RulesConfig::default()
        }
        .sanitized();
        assert_eq!(rules.tile_size, 64);
        assert_eq!(rules.player_speed, 260.0);
        assert_eq!(rules.chase_probability, 1.0);
        assert_eq!(rules.decision_cooldown_min, 0.35);
        assert_eq!(rules.decision_cooldown_max, 0.55);
        assert_eq!(rules.contact_radius, 28.0);
        assert_eq!(rules.player_hp, 5);
    }

    #[test]
    fn infinite_and_oversized_values_are_replaced() {
        let rules = RulesConfig {
            tile_size: 2_000_000_000,
            player_speed: f32::INFINITY,
            enemy_speed: f32::INFINITY,
            invulnerability_secs: f32::INFINITY,
            contact_radius: f32::INFINITY,
            decision_cooldown_max: f32::INFINITY,
            ..RulesConfig::default()
        }
        .sanitized();
        assert_eq!(rules.tile_size, 64);
        assert_eq!(rules.player_speed, 260.0);
        assert_eq!(rules.enemy_speed, 180.0);
        assert_eq!(rules.invulnerability_secs, 0.0);
        assert_eq!(rules.contact_radius, 28.0);
        assert_eq!(rules.decision_cooldown_min, 0.35);
        assert_eq!(rules.decision_cooldown_max, 0.55);
    }

    #[test]
    fn infinite_cooldown_from_toml_does_not_reach_the_ai() {
        use crate::sim::level::builtin_level;
        use crate::sim::session::GameSession;
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let c = parse("[enemy]\ndecision_cooldown_max = inf\n");
        assert_eq!(c.rules.decision_cooldown_max, 0.55);
        let mut s = GameSession::start(builtin_level(), &c.rules, StdRng::seed_from_u64(0)).unwrap();
        for _ in 0..60 {
            s.tick(0.016);
        }
    }

    #[test]
    fn valid_rules_pass_through() {
        let rules = RulesConfig { enemy_count: 0, chase_probability: 0.0, ..RulesConfig::default() };
        let s = rules.clone().sanitized();
        assert_eq!(s.enemy_count, 0);
        assert_eq!(s.chase_probability, 0.0);
    }

    #[test]
    fn zero_timings_are_floored() {
        let c = parse("[timing]\nframe_ms = 0\nanimation_ms = 0\n");
        assert_eq!(c.timing.frame_ms, 1);
        assert_eq!(c.timing.animation_ms, 1);
    }
}
