/// Events emitted during a session tick.
/// The presentation layer consumes these for flashes and logging.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// A point of damage landed; `hp` is what remains.
    PlayerHit { hp: u32 },
    /// hp reached 0 on this tick. Waits for an explicit acknowledgement.
    PlayerDefeated,
}
