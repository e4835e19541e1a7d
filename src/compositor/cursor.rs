//! Pointer cursor
//!
//! Global pointer position as reported by input dispatch, the previous
//! position for motion detection, and the shape requested by the window core
//! during interactive operations.

use serde::Serialize;

use crate::shared::Point;

/// Cursor shape feedback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorShape {
    #[default]
    Arrow,
    SizeAll,
    SizeNorthWest,
    SizeNorth,
    SizeNorthEast,
    SizeEast,
    SizeSouthEast,
    SizeSouth,
    SizeSouthWest,
    SizeWest,
}

#[derive(Debug, Clone, Default)]
pub struct Cursor {
    pub pos: Point,
    pub prev_pos: Point,
    pub shape: CursorShape,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_position(&mut self, pos: Point) {
        if self.pos != pos {
            self.prev_pos = self.pos;
            self.pos = pos;
        }
    }

    pub fn has_moved(&self) -> bool {
        self.pos != self.prev_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_previous_position() {
        let mut cursor = Cursor::new();
        cursor.update_position(Point::new(10, 20));
        cursor.update_position(Point::new(15, 20));
        assert_eq!(cursor.prev_pos, Point::new(10, 20));
        assert!(cursor.has_moved());
        cursor.update_position(Point::new(15, 20));
        assert!(cursor.has_moved());
    }
}
