/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant};

use log::{debug, error, info};

use config::{GameConfig, TimingConfig};
use domain::entity::Direction;
use sim::event::GameEvent;
use sim::level::load_level;
use sim::machine::{Command, GameStateMachine, Phase};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::Renderer;

/// Log destination while the terminal is in raw mode. Unset: stderr.
const LOG_FILE_ENV: &str = "GRIDCRAWL_LOG_FILE";

/// Status-line lifetime in frames.
const MESSAGE_FRAMES: u32 = 90;

fn main() {
    init_logging();

    let config = GameConfig::load();
    let level = match load_level(&config) {
        Ok(level) => level,
        Err(e) => {
            error!("level load failed: {e}");
            eprintln!("Could not load level: {e}");
            return;
        }
    };

    let mut machine = GameStateMachine::with_seed(level, config.rules.clone(), config.seed);
    let mut renderer = Renderer::new();

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut machine, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!("game loop aborted: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Grid Crawl!");
}

/// RUST_LOG controls the filter (default `warn`). Output goes to the file
/// named by GRIDCRAWL_LOG_FILE when set, so it stays off the game screen.
fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    builder.format_timestamp_millis();
    if let Ok(path) = std::env::var(LOG_FILE_ENV) {
        match File::create(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Cannot open log file {path}: {e}"),
        }
    }
    if let Err(e) = builder.try_init() {
        eprintln!("Logger already initialized: {e}");
    }
}

fn game_loop(
    machine: &mut GameStateMachine,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let timing = &config.timing;
    let frame_sleep = Duration::from_millis(timing.frame_ms);
    let anim_rate = Duration::from_millis(timing.animation_ms);
    let mut last_tick = Instant::now();
    let mut last_anim = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(machine, renderer, &kb, &gp) {
            break;
        }

        if let Some(session) = machine.session_mut() {
            if let Some(dir) = detect_movement(&kb, &gp) {
                session.request_player_move(dir);
            }
        }

        // Physics: variable dt, capped after a stall
        let now = Instant::now();
        let dt = frame_dt(now.duration_since(last_tick), timing);
        last_tick = now;
        let events = machine.tick(dt);
        process_events(renderer, &events);

        // Animation runs on its own clock
        if last_anim.elapsed() >= anim_rate {
            machine.step_animation();
            last_anim = Instant::now();
        }

        renderer.render(machine)?;
        std::thread::sleep(frame_sleep);
    }

    Ok(())
}

fn frame_dt(elapsed: Duration, timing: &TimingConfig) -> f32 {
    elapsed.min(Duration::from_millis(timing.max_dt_ms)).as_secs_f32()
}

fn detect_movement(kb: &InputState, gp: &GamepadState) -> Option<Direction> {
    kb.movement().or_else(|| gp.movement())
}

fn process_events(renderer: &mut Renderer, events: &[GameEvent]) {
    for event in events {
        debug!("event: {event:?}");
        match event {
            GameEvent::PlayerHit { hp } => {
                renderer.set_message(&format!("Ouch! {hp} HP left"), MESSAGE_FRAMES);
            }
            GameEvent::PlayerDefeated => {
                renderer.set_message("You were overwhelmed by slimes", 0);
            }
        }
    }
}

/// Menu/abort/acknowledge handling. Returns true to quit.
fn handle_meta(
    machine: &mut GameStateMachine,
    renderer: &mut Renderer,
    kb: &InputState,
    gp: &GamepadState,
) -> bool {
    let confirm = kb.confirm_pressed() || gp.confirm_pressed();
    let cancel = kb.cancel_pressed() || gp.cancel_pressed();

    let command = match machine.phase() {
        Phase::Menu => {
            if cancel {
                info!("quit from menu");
                return true;
            }
            confirm.then_some(Command::Start)
        }
        Phase::Active => {
            let defeated = machine.session().is_some_and(|s| s.is_defeated());
            if cancel {
                Some(Command::Abort)
            } else if confirm && defeated {
                Some(Command::AcknowledgeDefeat)
            } else {
                None
            }
        }
    };

    if let Some(cmd) = command {
        match machine.handle_command(cmd) {
            Ok(true) => renderer.set_message("", 0),
            Ok(false) => {}
            Err(e) => renderer.set_message(&format!("Cannot start: {e}"), 0),
        }
    }
    false
}
