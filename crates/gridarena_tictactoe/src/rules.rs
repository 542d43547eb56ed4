//! Win and draw detection.

use crate::types::{Board, Cell, Mark, SIZE};

/// The eight winning lines: three rows, three columns, two diagonals.
const LINES: [[(usize, usize); 3]; 8] = [
    // Rows
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    // Columns
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    // Diagonals
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

impl Board {
    /// Checks for a winner on the board.
    ///
    /// Scans all eight lines; at most one mark can hold a line in any
    /// board reached through legal play.
    pub fn winner(&self) -> Option<Mark> {
        for [a, b, c] in LINES {
            if let Some(Cell::Occupied(mark)) = self.get(a.0, a.1)
                && self.get(b.0, b.1) == Some(Cell::Occupied(mark))
                && self.get(c.0, c.1) == Some(Cell::Occupied(mark))
            {
                return Some(mark);
            }
        }
        None
    }

    /// Checks if the board is full.
    pub fn is_full(&self) -> bool {
        self.cells()
            .iter()
            .all(|row| row.iter().all(|&cell| cell != Cell::Empty))
    }

    /// A board is drawn when it is full with no winner.
    pub fn is_draw(&self) -> bool {
        self.winner().is_none() && self.is_full()
    }

    /// Returns the first empty cell in row-major scan order.
    pub fn first_empty(&self) -> Option<(usize, usize)> {
        for x in 0..SIZE {
            for y in 0..SIZE {
                if self.is_empty(x, y) {
                    return Some((x, y));
                }
            }
        }
        None
    }
}
