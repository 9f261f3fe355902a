/// Keyboard input tracker.
///
/// Tracks which keys are currently held down, enabling:
///   - Continuous walking while a direction key is held (each arrival
///     re-requests the next cell)
///   - Edge-triggered menu commands (only fire on initial press)
///
/// Uses crossterm's Release events when the terminal reports them.
/// Falls back to timeout-based release detection otherwise.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::Direction;

/// After this duration without a Press/Repeat event, consider the key released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_CANCEL: &[KeyCode] = &[KeyCode::Esc];

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from "not held" to "held" during the last drain.
    fresh_presses: Vec<KeyCode>,
    ctrl_c: bool,
    /// Set once a Release event has been seen; from then on releases are trusted.
    honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            ctrl_c: false,
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame, before the tick.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.ctrl_c = false;

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key);
            }
        }

        if !self.honor_release {
            let now = Instant::now();
            self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
        }
    }

    fn apply(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.ctrl_c = true;
            return;
        }
        match key.kind {
            KeyEventKind::Release => {
                self.honor_release = true;
                self.last_active.remove(&key.code);
            }
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map(|t| self.honor_release || t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    /// Held or freshly pressed direction. Vertical wins over horizontal.
    pub fn movement(&self) -> Option<Direction> {
        let active = |keys: &[KeyCode]| self.any_held(keys) || self.any_pressed(keys);
        if active(KEYS_UP) {
            Some(Direction::Up)
        } else if active(KEYS_DOWN) {
            Some(Direction::Down)
        } else if active(KEYS_LEFT) {
            Some(Direction::Left)
        } else if active(KEYS_RIGHT) {
            Some(Direction::Right)
        } else {
            None
        }
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_pressed(KEYS_CONFIRM)
    }

    pub fn cancel_pressed(&self) -> bool {
        self.any_pressed(KEYS_CANCEL)
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.ctrl_c
    }
}
