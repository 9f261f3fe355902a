/// Top-level game state machine.
///
///   Menu ──Start──▶ Active(session)
///   Active ──Abort──▶ Menu
///   Active ──AcknowledgeDefeat (hp == 0)──▶ Menu
///
/// Commands that don't apply in the current state are ignored. Defeat is
/// never an automatic transition; the host must acknowledge it.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RulesConfig;
use crate::domain::grid::Level;
use crate::error::SessionError;
use super::event::GameEvent;
use super::session::GameSession;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Menu,
    Active,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Start,
    Abort,
    AcknowledgeDefeat,
}

pub struct GameStateMachine {
    level: Level,
    rules: RulesConfig,
    /// Seeds each new session's generator.
    seeder: StdRng,
    /// `Some` exactly while Active.
    session: Option<GameSession>,
}

impl GameStateMachine {
    pub fn new(level: Level, rules: RulesConfig, seeder: StdRng) -> Self {
        GameStateMachine { level, rules, seeder, session: None }
    }

    /// Seeded from config when given, else from OS entropy.
    pub fn with_seed(level: Level, rules: RulesConfig, seed: Option<u64>) -> Self {
        let seeder = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self::new(level, rules, seeder)
    }

    pub fn phase(&self) -> Phase {
        if self.session.is_some() { Phase::Active } else { Phase::Menu }
    }

    pub fn level_name(&self) -> &str {
        &self.level.name
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut GameSession> {
        self.session.as_mut()
    }

    /// Apply a command. `Ok(true)` if the phase changed, `Ok(false)` if the
    /// command was ignored. A failed start leaves the machine in Menu.
    pub fn handle_command(&mut self, cmd: Command) -> Result<bool, SessionError> {
        match (cmd, self.phase()) {
            (Command::Start, Phase::Menu) => {
                let rng = StdRng::seed_from_u64(self.seeder.random());
                match GameSession::start(self.level.clone(), &self.rules, rng) {
                    Ok(session) => {
                        self.session = Some(session);
                        info!("Menu -> Active");
                        Ok(true)
                    }
                    Err(e) => {
                        warn!("could not start session: {e}");
                        Err(e)
                    }
                }
            }
            (Command::Abort, Phase::Active) => {
                self.session = None;
                info!("Active -> Menu (aborted)");
                Ok(true)
            }
            (Command::AcknowledgeDefeat, Phase::Active) => {
                if self.session.as_ref().is_some_and(GameSession::is_defeated) {
                    self.session = None;
                    info!("Active -> Menu (defeat acknowledged)");
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            _ => Ok(false),
        }
    }

    /// Physics tick. No-op in Menu.
    pub fn tick(&mut self, dt: f32) -> Vec<GameEvent> {
        match &mut self.session {
            Some(s) => s.tick(dt),
            None => vec![],
        }
    }

    /// Animation tick. No-op in Menu.
    pub fn step_animation(&mut self) {
        if let Some(s) = &mut self.session {
            s.step_animation();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Direction;
    use crate::sim::level::{builtin_level, parse_level};

    fn machine() -> GameStateMachine {
        GameStateMachine::with_seed(builtin_level(), RulesConfig::default(), Some(1234))
    }

    #[test]
    fn starts_in_menu() {
        let m = machine();
        assert_eq!(m.phase(), Phase::Menu);
        assert!(m.session().is_none());
    }

    #[test]
    fn start_builds_fresh_session() {
        let mut m = machine();
        assert!(m.handle_command(Command::Start).unwrap());
        assert_eq!(m.phase(), Phase::Active);
        let s = m.session().unwrap();
        assert_eq!(s.player().hp(), 5);
        assert_eq!(s.enemies().len(), 4);
    }

    #[test]
    fn configured_enemy_count_is_used() {
        let rules = RulesConfig { enemy_count: 2, ..RulesConfig::default() };
        let mut m = GameStateMachine::with_seed(builtin_level(), rules, Some(5));
        m.handle_command(Command::Start).unwrap();
        assert_eq!(m.session().unwrap().enemies().len(), 2);
    }

    #[test]
    fn start_while_active_is_ignored() {
        let mut m = machine();
        m.handle_command(Command::Start).unwrap();
        m.session_mut().unwrap().request_player_move(Direction::Right);
        m.tick(1.0);
        let cell = m.session().unwrap().player().mover.cell();
        assert!(!m.handle_command(Command::Start).unwrap());
        assert_eq!(m.session().unwrap().player().mover.cell(), cell);
    }

    #[test]
    fn abort_returns_to_menu() {
        let mut m = machine();
        assert!(!m.handle_command(Command::Abort).unwrap());
        m.handle_command(Command::Start).unwrap();
        assert!(m.handle_command(Command::Abort).unwrap());
        assert_eq!(m.phase(), Phase::Menu);
        assert!(m.session().is_none());
        assert!(m.tick(0.1).is_empty());
    }

    #[test]
    fn acknowledge_requires_defeat() {
        let mut m = machine();
        assert!(!m.handle_command(Command::AcknowledgeDefeat).unwrap());
        m.handle_command(Command::Start).unwrap();
        assert!(!m.handle_command(Command::AcknowledgeDefeat).unwrap());
        assert_eq!(m.phase(), Phase::Active);
    }

    #[test]
    fn defeat_waits_for_acknowledgement() {
        // Corridor: the only free cells far enough from the spawn are at the
        // far end, and enemies chase straight down the corridor.
        let level = parse_level("#######\n#P....#\n#######").unwrap();
        let rules = RulesConfig {
            enemy_count: 3,
            player_hp: 2,
            chase_probability: 1.0,
            ..RulesConfig::default()
        };
        let mut m = GameStateMachine::with_seed(level, rules, Some(3));
        m.handle_command(Command::Start).unwrap();

        let mut defeated = false;
        for _ in 0..2000 {
            if m.tick(0.02).contains(&GameEvent::PlayerDefeated) {
                defeated = true;
            }
        }
        assert!(defeated);
        // Still Active until acknowledged
        assert_eq!(m.phase(), Phase::Active);
        assert!(m.session().unwrap().is_defeated());

        assert!(m.handle_command(Command::AcknowledgeDefeat).unwrap());
        assert_eq!(m.phase(), Phase::Menu);

        // A new start gets a full-health session
        m.handle_command(Command::Start).unwrap();
        assert_eq!(m.session().unwrap().player().hp(), 2);
        assert!(!m.session().unwrap().is_defeated());
    }

    #[test]
    fn failed_start_stays_in_menu() {
        let level = parse_level("#####\n#P..#\n#####").unwrap();
        let mut m = GameStateMachine::with_seed(level, RulesConfig::default(), Some(0));
        assert!(m.handle_command(Command::Start).is_err());
        assert_eq!(m.phase(), Phase::Menu);
    }

    #[test]
    fn same_seed_same_sessions() {
        let mut a = machine();
        let mut b = machine();
        for _ in 0..3 {
            a.handle_command(Command::Start).unwrap();
            b.handle_command(Command::Start).unwrap();
            let ca: Vec<_> = a.session().unwrap().enemies().iter().map(|e| e.mover.cell()).collect();
            let cb: Vec<_> = b.session().unwrap().enemies().iter().map(|e| e.mover.cell()).collect();
            assert_eq!(ca, cb);
            a.handle_command(Command::Abort).unwrap();
            b.handle_command(Command::Abort).unwrap();
        }
    }
}
