/// Level loader.
///
/// ## Sources (priority order):
///   1. `level_file` from config.toml
///   2. Built-in level
///
/// ## Format (`.txt`):
///   Optional line 1: `# Level Name`
///   Lines: map rows, all the same width. Blank lines are skipped.
///
/// ## Glyph legend:
///   '#' = Wall    '.' = Floor    'P' = Floor + player spawn (at most one)

use std::path::Path;

use log::{debug, info};

use crate::config::GameConfig;
use crate::domain::grid::{GridPos, Level};
use crate::domain::tile::Cell;
use crate::error::LevelError;

const BUILTIN_NAME: &str = "Crypt";

const BUILTIN_ROWS: &[&str] = &[
    "##########",
    "#P.......#",
    "#..##....#",
    "#........#",
    "#...##...#",
    "#........#",
    "#..#.....#",
    "##########",
];

/// Load the configured level, or the built-in one when none is configured.
pub fn load_level(config: &GameConfig) -> Result<Level, LevelError> {
    match &config.level_file {
        Some(path) => load_level_file(path),
        None => Ok(builtin_level()),
    }
}

pub fn load_level_file(path: &Path) -> Result<Level, LevelError> {
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let level = parse_level(&text)?;
    info!(
        "loaded level {:?} ({}x{}) from {}",
        level.name,
        level.cols(),
        level.rows(),
        path.display()
    );
    Ok(level)
}

pub fn builtin_level() -> Level {
    let mut text = format!("# {BUILTIN_NAME}\n");
    text.push_str(&BUILTIN_ROWS.join("\n"));
    // The built-in rows are fixed and covered by tests.
    parse_level(&text).unwrap_or_else(|_| Level::new(BUILTIN_NAME.into(), vec![], None))
}

/// Parse a level from its text form.
pub fn parse_level(text: &str) -> Result<Level, LevelError> {
    let mut name = String::new();
    let mut cells: Vec<Vec<Cell>> = Vec::new();
    let mut spawn: Option<GridPos> = None;

    let mut lines = text.lines().map(|l| l.trim_end()).filter(|l| !l.is_empty()).peekable();
    if let Some(first) = lines.peek() {
        if let Some(title) = first.strip_prefix("# ") {
            name = title.trim().to_string();
            lines.next();
        }
    }

    for (row, line) in lines.enumerate() {
        let mut out = Vec::with_capacity(line.len());
        for (col, glyph) in line.chars().enumerate() {
            let cell = Cell::from_glyph(glyph).ok_or(LevelError::UnknownGlyph { glyph, row, col })?;
            if glyph == 'P' {
                if spawn.is_some() {
                    return Err(LevelError::DuplicateSpawn { row, col });
                }
                spawn = Some(GridPos::new(col as i32, row as i32));
            }
            out.push(cell);
        }
        if let Some(first) = cells.first() {
            if out.len() != first.len() {
                return Err(LevelError::Ragged { row, expected: first.len(), found: out.len() });
            }
        }
        cells.push(out);
    }

    if cells.is_empty() || cells[0].is_empty() {
        return Err(LevelError::Empty);
    }
    if name.is_empty() {
        name = "Untitled".to_string();
    }
    debug!("parsed level {name:?}: {} rows, spawn {spawn:?}", cells.len());
    Ok(Level::new(name, cells, spawn))
}
