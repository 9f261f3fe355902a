/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Each grid tile covers a TILE_W x TILE_H block of terminal cells. Actors
/// are drawn at their continuous position projected into that space, so
/// they glide between tiles instead of jumping.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::anim::AnimMode;
use crate::domain::entity::{ActorKind, ActorView};
use crate::domain::grid::{GridPos, Vec2};
use crate::domain::tile;
use crate::sim::machine::{GameStateMachine, Phase};
use crate::sim::session::GameSession;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Explicit dark background for every "empty" terminal cell, so the
    /// inter-row gap color matches on VTE terminals.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    /// Write a string at (x, y). Each char occupies 1 column.
    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Overwrite only the glyph and foreground, keeping the background.
    /// Negative or off-screen positions are clipped.
    fn overlay(&mut self, x: i32, y: i32, ch: char, fg: Color) {
        if x < 0 || y < 0 || ch == ' ' {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            let bg = self.get(x, y).bg;
            self.set(x, y, Cell { ch, fg, bg });
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Layout ──

/// Terminal columns per grid tile.
const TILE_W: usize = 4;
/// Terminal rows per grid tile.
const TILE_H: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MAP_COL: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };
const WALL_FG: Color = Color::Rgb { r: 120, g: 110, b: 130 };
const WALL_BG: Color = Color::Rgb { r: 60, g: 55, b: 70 };
const FLOOR_A: Color = Color::Rgb { r: 34, g: 30, b: 40 };
const FLOOR_B: Color = Color::Rgb { r: 40, g: 36, b: 46 };
const HERO_FG: Color = Color::Rgb { r: 255, g: 220, b: 120 };
const SLIME_FG: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const HEART_FG: Color = Color::Rgb { r: 255, g: 60, b: 60 };

/// Blink period while invulnerable, in seconds.
const BLINK_PERIOD: f32 = 0.1;

// ── Actor art: two rows of TILE_W glyphs per frame ──

type Art = [&'static str; TILE_H];

const HERO_IDLE: &[Art] = &[
    [" oo ", " /\\ "],
    [" oo ", " /\\ "],
    [" -- ", " /\\ "],
    [" oo ", " /\\ "],
];
const HERO_WALK: &[Art] = &[
    [" oo ", " /| "],
    [" oo ", " || "],
    [" oo ", " |\\ "],
    [" oo ", " || "],
];
const SLIME_IDLE: &[Art] = &[
    ["    ", "(..)"],
    [" __ ", "(..)"],
    [" __ ", "(oo)"],
];
const SLIME_WALK: &[Art] = &[
    [" __ ", "(..)"],
    ["    ", "(..)"],
    [" __ ", "(..)"],
    ["    ", "(oo)"],
];

fn actor_art(view: &ActorView) -> (Art, Color) {
    let (set, fg) = match (view.kind, view.mode) {
        (ActorKind::Hero, AnimMode::Idle) => (HERO_IDLE, HERO_FG),
        (ActorKind::Hero, AnimMode::Walk) => (HERO_WALK, HERO_FG),
        (ActorKind::Slime, AnimMode::Idle) => (SLIME_IDLE, SLIME_FG),
        (ActorKind::Slime, AnimMode::Walk) => (SLIME_WALK, SLIME_FG),
    };
    (set[view.frame % set.len()], fg)
}

/// Top-left terminal offset (relative to the map origin) of an actor whose
/// center sits at `pos` in pixel space.
fn project(pos: Vec2, tile_size: i32) -> (i32, i32) {
    let t = tile_size.max(1) as f32;
    let half = (tile_size / 2) as f32;
    let col = ((pos.x - half) / t * TILE_W as f32).round() as i32;
    let row = ((pos.y - half) / t * TILE_H as f32).round() as i32;
    (col, row)
}

/// Visible on even blink phases; always visible when not invulnerable.
fn blink_visible(invulnerable_remaining: f32) -> bool {
    invulnerable_remaining <= 0.0 || ((invulnerable_remaining / BLINK_PERIOD) as u32) % 2 == 0
}

fn hearts(hp: u32, max_hp: u32) -> (String, String) {
    let full = hp.min(max_hp) as usize;
    ("♥".repeat(full), "♡".repeat(max_hp as usize - full))
}

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    message: String,
    message_frames: u32,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            message: String::new(),
            message_frames: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        // Force full repaint on first frame
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Show a status line for `frames` rendered frames (0 = until replaced).
    pub fn set_message(&mut self, text: &str, frames: u32) {
        self.message = text.to_string();
        self.message_frames = frames;
    }

    pub fn render(&mut self, machine: &GameStateMachine) -> io::Result<()> {
        // Detect terminal resize
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change: clear for a clean transition
        let phase = machine.phase();
        if self.last_phase != Some(phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(phase);
        }

        self.front.clear();
        match machine.session() {
            Some(session) => self.compose_game(session),
            None => self.compose_menu(machine.level_name()),
        }
        self.compose_message();

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);

        if self.message_frames > 0 {
            self.message_frames -= 1;
            if self.message_frames == 0 {
                self.message.clear();
            }
        }
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;

        // Explicit base colors; ResetColor would fall back to the terminal default.
        queue!(self.writer,
            SetForegroundColor(Color::White),
            SetBackgroundColor(Cell::BASE_BG),
        )?;

        for y in 0..self.front.height {
            let mut need_move = true;
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, s: &GameSession) {
        let level = s.grid().level();
        let map_h = level.rows() * TILE_H;

        // Painter's order: lower rows overlap upper ones, hero on top of ties
        let mut actors = s.actors();
        actors.sort_by_key(|v| (v.cell.row, v.kind == ActorKind::Hero));
        let hp = actors.iter().find_map(|v| v.hp).unwrap_or(0);

        // HUD row
        self.front.fill_row(HUD_ROW, HUD_BG);
        let label = format!(" {}   HP ", level.name);
        self.front.put_str(0, HUD_ROW, &label, Color::White, HUD_BG);
        let (full, empty) = hearts(hp, s.max_hp());
        let hx = label.chars().count();
        self.front.put_str(hx, HUD_ROW, &full, HEART_FG, HUD_BG);
        self.front.put_str(hx + full.chars().count(), HUD_ROW, &empty, Color::DarkGrey, HUD_BG);
        let hint = "ESC: Menu ";
        let hint_x = self.front.width.saturating_sub(hint.len());
        self.front.put_str(hint_x, HUD_ROW, hint, Color::Grey, HUD_BG);

        // Tiles
        for row in 0..level.rows() {
            for col in 0..level.cols() {
                let pos = GridPos::new(col as i32, row as i32);
                if let Some(cell) = level.cell(pos) {
                    self.compose_tile(cell, col, row);
                }
            }
        }

        let tile_size = s.grid().tile_size();
        for view in &actors {
            if view.invulnerable && !blink_visible(s.player().invulnerable_remaining()) {
                continue;
            }
            let (dx, dy) = project(view.position, tile_size);
            let (art, fg) = actor_art(view);
            log::trace!("{:?} at {:?}: {}", view.kind, view.cell, view.frame_name);
            for (ry, line) in art.iter().enumerate() {
                for (rx, ch) in line.chars().enumerate() {
                    self.front.overlay(
                        MAP_COL as i32 + dx + rx as i32,
                        MAP_ROW as i32 + dy + ry as i32,
                        ch,
                        fg,
                    );
                }
            }
        }

        if s.is_defeated() {
            self.compose_game_over(level.cols() * TILE_W, map_h);
        }

        // Help bar
        let help_row = MAP_ROW + map_h + 1;
        if help_row < self.front.height {
            let help = " ←→↑↓ / WASD: Move   ESC: Menu   Ctrl+C: Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Color::Reset);
        }
    }

    fn compose_tile(&mut self, cell: tile::Cell, col: usize, row: usize) {
        let x0 = MAP_COL + col * TILE_W;
        let y0 = MAP_ROW + row * TILE_H;
        let (ch, fg, bg) = if cell.is_blocking() {
            ('▓', WALL_FG, WALL_BG)
        } else if (col + row) % 2 == 0 {
            (' ', Color::White, FLOOR_A)
        } else {
            (' ', Color::White, FLOOR_B)
        };
        for dy in 0..TILE_H {
            for dx in 0..TILE_W {
                self.front.set(x0 + dx, y0 + dy, Cell::new(ch, fg, bg));
            }
        }
    }

    fn compose_game_over(&mut self, map_w: usize, map_h: usize) {
        let box_art = [
            "╔══════════════════════╗",
            "║      GAME  OVER      ║",
            "║                      ║",
            "║  ENTER: Back to Menu ║",
            "╚══════════════════════╝",
        ];
        let box_w = box_art[0].chars().count();
        let x = MAP_COL + map_w.saturating_sub(box_w) / 2;
        let y = MAP_ROW + map_h.saturating_sub(box_art.len()) / 2;
        let dim = Color::Rgb { r: 40, g: 20, b: 20 };
        for (i, line) in box_art.iter().enumerate() {
            self.front.put_str(x, y + i, line, HEART_FG, dim);
        }
    }

    fn compose_menu(&mut self, level_name: &str) {
        let title = [
            r"  ___      _    _    ___                 _ ",
            r" / __|_ _ (_)__| |  / __|_ _ __ ___ __ _| |",
            r"| (_ | '_|| / _` | | (__| '_/ _` \ V  V / |",
            r" \___|_|  |_\__,_|  \___|_| \__,_|\_/\_/|_|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 2 + i, line, HERO_FG, Color::Reset);
        }

        let level = format!("Dungeon: {level_name}");
        self.front.put_str(8, 8, &level, Color::Grey, Color::Reset);

        let menu_base = 10;
        self.front.put_str(8, menu_base, "ENTER   Start", SLIME_FG, Color::Reset);
        self.front.put_str(8, menu_base + 1, "ESC     Quit", Color::White, Color::Reset);

        let help = [
            "Controls",
            "  ←→↑↓ / WASD   Move",
            "  ESC           Back to menu",
            "  Pad: D-pad/stick, Start/A, Select/B",
        ];
        for (i, line) in help.iter().enumerate() {
            let color = if i == 0 { HERO_FG } else { Color::White };
            self.front.put_str(8, menu_base + 3 + i, line, color, Color::Reset);
        }
    }

    /// Message bar on the last row.
    fn compose_message(&mut self) {
        if self.message.is_empty() || self.front.height == 0 {
            return;
        }
        let row = self.front.height - 1;
        let msg = format!(" ◈ {} ", self.message);
        self.front.fill_row(row, MSG_BG);
        self.front.put_str(0, row, &msg, Color::Black, MSG_BG);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(kind: ActorKind, mode: AnimMode, frame: usize, frame_name: &'static str) -> ActorView {
        ActorView {
            kind,
            cell: GridPos::new(1, 1),
            position: Vec2::new(96.0, 96.0),
            mode,
            frame,
            frame_name,
            hp: None,
            invulnerable: false,
        }
    }

    #[test]
    fn cell_centers_project_onto_tile_blocks() {
        assert_eq!(project(Vec2::new(32.0, 32.0), 64), (0, 0));
        assert_eq!(project(Vec2::new(96.0, 160.0), 64), (4, 4));
    }

    #[test]
    fn halfway_between_tiles_projects_halfway() {
        // Midway from (1,1) to (2,1)
        assert_eq!(project(Vec2::new(128.0, 96.0), 64), (6, 2));
    }

    #[test]
    fn art_follows_walk_and_frame() {
        let (idle, _) = actor_art(&view(ActorKind::Hero, AnimMode::Idle, 2, "hero_idle_2"));
        assert_eq!(idle, HERO_IDLE[2]);
        let (walk, fg) = actor_art(&view(ActorKind::Slime, AnimMode::Walk, 3, "slime_walk_3"));
        assert_eq!(walk, SLIME_WALK[3]);
        assert_eq!(fg, SLIME_FG);
    }

    #[test]
    fn art_uses_mode_not_frame_name() {
        let (art, _) = actor_art(&view(ActorKind::Hero, AnimMode::Walk, 1, "stride_1"));
        assert_eq!(art, HERO_WALK[1]);
        let (art, _) = actor_art(&view(ActorKind::Slime, AnimMode::Idle, 0, "walk_in_place"));
        assert_eq!(art, SLIME_IDLE[0]);
    }

    #[test]
    fn art_rows_fill_the_tile_width() {
        for set in [HERO_IDLE, HERO_WALK, SLIME_IDLE, SLIME_WALK] {
            for art in set {
                for line in art {
                    assert_eq!(line.chars().count(), TILE_W);
                }
            }
        }
    }

    #[test]
    fn hearts_split_full_and_lost() {
        assert_eq!(hearts(3, 5), ("♥♥♥".to_string(), "♡♡".to_string()));
        assert_eq!(hearts(0, 2), (String::new(), "♡♡".to_string()));
    }

    #[test]
    fn blink_only_while_invulnerable() {
        assert!(blink_visible(0.0));
        assert!(blink_visible(0.05));
        assert!(!blink_visible(0.15));
    }

    #[test]
    fn overlay_keeps_background_and_clips() {
        let mut fb = FrameBuffer::new(4, 2);
        fb.set(1, 1, Cell::new(' ', Color::White, FLOOR_A));
        fb.overlay(1, 1, 'x', HERO_FG);
        assert_eq!(fb.get(1, 1), Cell { ch: 'x', fg: HERO_FG, bg: FLOOR_A });
        fb.overlay(-1, 0, 'x', HERO_FG);
        fb.overlay(9, 9, 'x', HERO_FG);
        fb.overlay(0, 0, ' ', HERO_FG);
        assert_eq!(fb.get(0, 0), Cell::BLANK);
    }
}
