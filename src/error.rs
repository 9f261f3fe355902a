/// Error types. Rejected moves are plain `bool`s, not errors; only level
/// loading and session construction can fail.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::grid::GridPos;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read level file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level has no rows")]
    Empty,
    #[error("row {row} is {found} cells wide, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("unknown glyph {glyph:?} at row {row}, col {col}")]
    UnknownGlyph { glyph: char, row: usize, col: usize },
    #[error("second spawn marker at row {row}, col {col}")]
    DuplicateSpawn { row: usize, col: usize },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("player spawn {cell:?} is blocked")]
    SpawnBlocked { cell: GridPos },
    #[error("no interior cell is free and at least {min_distance} cells from the spawn ({requested} enemies requested)")]
    NoSpawnRoom { requested: usize, min_distance: i32 },
    #[error("placed only {placed} of {requested} enemies after {attempts} attempts")]
    SpawnAttemptsExhausted { placed: usize, requested: usize, attempts: u32 },
}
