/// Cell types of the dungeon grid.
/// Properties are queried via methods, not stored as flags,
/// so cell semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Cell {
    #[default]
    Floor,
    Wall,
}

impl Cell {
    /// Does this cell stop an actor from entering it?
    pub fn is_blocking(self) -> bool {
        matches!(self, Cell::Wall)
    }

    /// Map a level glyph to a cell. `P` is a floor cell carrying the spawn marker.
    pub fn from_glyph(ch: char) -> Option<Cell> {
        match ch {
            '#' => Some(Cell::Wall),
            '.' | 'P' => Some(Cell::Floor),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glyphs_map_to_cells() {
        assert_eq!(Cell::from_glyph('#'), Some(Cell::Wall));
        assert_eq!(Cell::from_glyph('.'), Some(Cell::Floor));
        assert_eq!(Cell::from_glyph('P'), Some(Cell::Floor));
        assert_eq!(Cell::from_glyph('x'), None);
    }

    #[test]
    fn only_walls_block() {
        assert!(Cell::Wall.is_blocking());
        assert!(!Cell::Floor.is_blocking());
    }
}
