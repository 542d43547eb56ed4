//! Core domain types for tic-tac-toe.

use derive_more::{Display, Error};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// Board side length. Every coordinate must lie in `[0, SIZE)`.
pub const SIZE: usize = 3;

/// A player mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    /// Mark X (goes first).
    X,
    /// Mark O (goes second).
    O,
}

impl Mark {
    /// Returns the opposing mark.
    pub fn opponent(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// Wire encoding of the mark.
    pub fn as_str(self) -> &'static str {
        match self {
            Mark::X => "X",
            Mark::O => "O",
        }
    }
}

/// A cell on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Empty cell.
    Empty,
    /// Cell occupied by a mark.
    Occupied(Mark),
}

impl Cell {
    /// Wire encoding: `""` for empty, `"X"`/`"O"` otherwise.
    pub fn as_str(self) -> &'static str {
        match self {
            Cell::Empty => "",
            Cell::Occupied(mark) => mark.as_str(),
        }
    }

    /// Returns the occupying mark, if any.
    pub fn mark(self) -> Option<Mark> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(mark) => Some(mark),
        }
    }
}

// Cells travel on the wire as plain strings so clients see the same
// board encoding the rest of the protocol uses.
impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "" => Ok(Cell::Empty),
            "X" => Ok(Cell::Occupied(Mark::X)),
            "O" => Ok(Cell::Occupied(Mark::O)),
            other => Err(de::Error::custom(format!("invalid cell: '{other}'"))),
        }
    }
}

/// Errors that can occur when placing a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum PlaceError {
    /// Coordinates fall outside the board.
    #[display("Coordinates out of range (must be 0-2)")]
    OutOfRange,
    /// The target cell is already occupied.
    #[display("Cell is already occupied")]
    Occupied,
}

/// 3x3 tic-tac-toe board.
///
/// Once a cell is occupied it never reverts to empty; there is no
/// clear operation short of constructing a fresh board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [[Cell; SIZE]; SIZE],
}

impl Board {
    /// Creates a new empty board.
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; SIZE]; SIZE],
        }
    }

    /// Gets the cell at the given coordinates, `None` when out of range.
    pub fn get(&self, x: usize, y: usize) -> Option<Cell> {
        self.cells.get(x).and_then(|row| row.get(y)).copied()
    }

    /// Checks whether the cell at the given coordinates is empty.
    ///
    /// Out-of-range coordinates read as not empty.
    pub fn is_empty(&self, x: usize, y: usize) -> bool {
        matches!(self.get(x, y), Some(Cell::Empty))
    }

    /// Places a mark at the given coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceError::OutOfRange`] for coordinates outside
    /// `[0, 3)` and [`PlaceError::Occupied`] for a non-empty target.
    /// The board is untouched on rejection.
    pub fn place(&mut self, x: usize, y: usize, mark: Mark) -> Result<(), PlaceError> {
        if x >= SIZE || y >= SIZE {
            return Err(PlaceError::OutOfRange);
        }
        if self.cells[x][y] != Cell::Empty {
            return Err(PlaceError::Occupied);
        }
        self.cells[x][y] = Cell::Occupied(mark);
        Ok(())
    }

    /// Returns all cells in row-major order.
    pub fn cells(&self) -> &[[Cell; SIZE]; SIZE] {
        &self.cells
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
