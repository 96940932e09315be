//! Square board of stones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Board edge length used when no size is configured.
pub const DEFAULT_BOARD_SIZE: usize = 15;

/// A stone color. Doubles as the player role bound to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stone {
    Black,
    White,
}

impl Stone {
    /// The other color.
    pub fn opponent(self) -> Self {
        match self {
            Stone::Black => Stone::White,
            Stone::White => Stone::Black,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stone::Black => "black",
            Stone::White => "white",
        }
    }
}

impl fmt::Display for Stone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An N×N grid of optional stones. The size is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    cells: Vec<Option<Stone>>,
}

impl Board {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether `(row, col)` lies on the board.
    pub fn contains(&self, row: i64, col: i64) -> bool {
        let size = self.size as i64;
        (0..size).contains(&row) && (0..size).contains(&col)
    }

    /// Looks up a cell.
    ///
    /// The outer `Option` is `None` for coordinates off the board; the inner
    /// one is `None` for an empty cell.
    pub fn cell(&self, row: i64, col: i64) -> Option<Option<Stone>> {
        if self.contains(row, col) {
            Some(self.cells[self.index(row as usize, col as usize)])
        } else {
            None
        }
    }

    /// The stone at `(row, col)`, treating off-board coordinates as empty.
    pub fn get(&self, row: i64, col: i64) -> Option<Stone> {
        self.cell(row, col).flatten()
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, stone: Option<Stone>) {
        let idx = self.index(row, col);
        self.cells[idx] = stone;
    }

    pub(crate) fn clear(&mut self) {
        self.cells.iter_mut().for_each(|cell| *cell = None);
    }

    pub fn stone_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }

    /// Row-major copy of the grid, as sent in state snapshots.
    pub fn rows(&self) -> Vec<Vec<Option<Stone>>> {
        self.cells
            .chunks(self.size.max(1))
            .map(|row| row.to_vec())
            .collect()
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.size + col
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_SIZE)
    }
}
