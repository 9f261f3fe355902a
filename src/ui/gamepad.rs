/// Gamepad input tracker using gilrs.
///
/// Confirm/cancel button mapping is loaded from config.toml via
/// `load_button_config()`. Default mapping:
///   D-pad / Left Stick    →  Movement
///   Start / A             →  Start game / acknowledge defeat
///   Select / B            →  Back to menu

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};

use crate::config::GamepadConfig;
use crate::domain::entity::Direction;

const STICK_DEADZONE: f32 = 0.25;

/// Logical face/menu buttons (d-pad is tracked separately).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    Start,
    Select,
}

const BTN_COUNT: usize = 6;

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH" => Some(Btn::A),
            "B" | "EAST" => Some(Btn::B),
            "X" | "WEST" => Some(Btn::X),
            "Y" | "NORTH" => Some(Btn::Y),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South => Some(Btn::A),
            Button::East => Some(Btn::B),
            Button::West => Some(Btn::X),
            Button::North => Some(Btn::Y),
            Button::Start => Some(Btn::Start),
            Button::Select => Some(Btn::Select),
            _ => None,
        }
    }
}

fn parse_buttons(names: &[String]) -> Vec<Btn> {
    names.iter().filter_map(|s| Btn::from_name(s)).collect()
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    pressed: [bool; BTN_COUNT], // edge, cleared every update
    /// D-pad held state, indexed like `Direction::ALL`.
    dpad: [bool; 4],
    stick_x: f32,
    stick_y: f32,

    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs = match Gilrs::new() {
            Ok(g) => Some(g),
            Err(e) => {
                log::info!("gamepad support unavailable: {e}");
                None
            }
        };

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            pressed: [false; BTN_COUNT],
            dpad: [false; 4],
            stick_x: 0.0,
            stick_y: 0.0,
            confirm: vec![Btn::Start, Btn::A],
            cancel: vec![Btn::Select, Btn::B],
        }
    }

    /// Load button mapping from config. Unknown names are skipped; an
    /// entirely unknown list keeps the defaults.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        let confirm = parse_buttons(&cfg.confirm);
        if !confirm.is_empty() { self.confirm = confirm; }
        let cancel = parse_buttons(&cfg.cancel);
        if !cancel.is_empty() { self.cancel = cancel; }
    }

    pub fn update(&mut self) {
        self.pressed = [false; BTN_COUNT];

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();
        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => self.set_button(btn, true),
                EventType::ButtonReleased(btn, _) => self.set_button(btn, false),
                EventType::AxisChanged(Axis::LeftStickX, v, _) => self.stick_x = v,
                EventType::AxisChanged(Axis::LeftStickY, v, _) => self.stick_y = v,
                EventType::Disconnected => self.release_all(),
                _ => {}
            }
        }
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, btn: Button, down: bool) {
        let dir = match btn {
            Button::DPadRight => Some(Direction::Right),
            Button::DPadLeft => Some(Direction::Left),
            Button::DPadDown => Some(Direction::Down),
            Button::DPadUp => Some(Direction::Up),
            _ => None,
        };
        if let Some(d) = dir {
            self.dpad[dir_index(d)] = down;
            return;
        }
        if down {
            if let Some(b) = Btn::from_gilrs(btn) {
                self.pressed[b as usize] = true;
            }
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        self.pressed = [false; BTN_COUNT];
        self.dpad = [false; 4];
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }

    fn any_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.pressed[b as usize])
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_pressed(&self.confirm)
    }

    pub fn cancel_pressed(&self) -> bool {
        self.any_pressed(&self.cancel)
    }

    /// D-pad first, then the left stick past the deadzone. Vertical wins.
    pub fn movement(&self) -> Option<Direction> {
        for d in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            if self.dpad[dir_index(d)] {
                return Some(d);
            }
        }
        if self.stick_y > STICK_DEADZONE {
            Some(Direction::Up)
        } else if self.stick_y < -STICK_DEADZONE {
            Some(Direction::Down)
        } else if self.stick_x < -STICK_DEADZONE {
            Some(Direction::Left)
        } else if self.stick_x > STICK_DEADZONE {
            Some(Direction::Right)
        } else {
            None
        }
    }
}

fn dir_index(d: Direction) -> usize {
    Direction::ALL.iter().position(|&x| x == d).unwrap_or(0)
}
