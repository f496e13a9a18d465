//! Grid placement and win detection

use crate::types::{CellPos, Disc, WinKind};
use serde::{Deserialize, Serialize};

/// Number of rows in the grid; row 0 is the top
pub const ROWS: usize = 6;
/// Number of columns in the grid
pub const COLS: usize = 7;
/// Minimum run length that ends the game
pub const WIN_LENGTH: usize = 4;

/// The four scan axes, in detection order. Each is a (row, col) step;
/// the scan walks both the positive and negative direction of the step.
const AXES: [(i32, i32, WinKind); 4] = [
    (0, 1, WinKind::Horizontal),
    (1, 0, WinKind::Vertical),
    (1, 1, WinKind::Diagonal),
    (-1, 1, WinKind::Diagonal),
];

/// A winning run through a just-placed disc
#[derive(Debug, Clone, PartialEq)]
pub struct WinLine {
    pub kind: WinKind,
    /// Full connected run, which may exceed four cells
    pub cells: Vec<CellPos>,
}

/// Fixed 6x7 grid. Only the lowest empty row of a column is ever written,
/// so an occupied cell never sits above an empty one (gravity invariant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: [[Option<Disc>; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an empty board
    pub fn new() -> Self {
        Self {
            cells: [[None; COLS]; ROWS],
        }
    }

    /// Get the disc at a cell, if any
    pub fn cell(&self, row: usize, col: usize) -> Option<Disc> {
        self.cells[row][col]
    }

    /// Lowest empty row in the column, or None when the column is full
    /// or out of range.
    pub fn drop_row(&self, col: usize) -> Option<usize> {
        if col >= COLS {
            return None;
        }
        (0..ROWS).rev().find(|&row| self.cells[row][col].is_none())
    }

    /// Write a disc at an exact cell. Callers are expected to place at
    /// `drop_row` only; simulation retracts with [`Board::clear`].
    pub fn place(&mut self, row: usize, col: usize, disc: Disc) {
        self.cells[row][col] = Some(disc);
    }

    /// Retract a simulated placement
    pub fn clear(&mut self, row: usize, col: usize) {
        self.cells[row][col] = None;
    }

    /// True iff the top row has no empty cell; with the gravity invariant
    /// this means no legal column remains.
    pub fn is_full(&self) -> bool {
        self.cells[0].iter().all(|cell| cell.is_some())
    }

    /// Columns whose top cell is empty, in ascending order
    pub fn legal_columns(&self) -> Vec<usize> {
        (0..COLS).filter(|&col| self.cells[0][col].is_none()).collect()
    }

    /// Scan the four axes through the just-placed cell and report the first
    /// axis with a contiguous same-color run of at least [`WIN_LENGTH`].
    /// Returns the full connected run, which may exceed four cells.
    pub fn detect_win(&self, row: usize, col: usize, disc: Disc) -> Option<WinLine> {
        for (dr, dc, kind) in AXES {
            let cells = self.run_through(row, col, disc, dr, dc);
            if cells.len() >= WIN_LENGTH {
                return Some(WinLine { kind, cells });
            }
        }
        None
    }

    /// Accumulate the contiguous same-color run along one axis, walking
    /// outward in both directions from the placed cell (inclusive).
    fn run_through(&self, row: usize, col: usize, disc: Disc, dr: i32, dc: i32) -> Vec<CellPos> {
        let mut cells = vec![CellPos::new(row, col)];

        for sign in [1i32, -1i32] {
            let mut r = row as i32 + dr * sign;
            let mut c = col as i32 + dc * sign;
            while (0..ROWS as i32).contains(&r)
                && (0..COLS as i32).contains(&c)
                && self.cells[r as usize][c as usize] == Some(disc)
            {
                cells.push(CellPos::new(r as usize, c as usize));
                r += dr * sign;
                c += dc * sign;
            }
        }

        cells
    }

    /// Rows of optional colors for wire payloads
    pub fn rows(&self) -> Vec<Vec<Option<Disc>>> {
        self.cells.iter().map(|row| row.to_vec()).collect()
    }
}
