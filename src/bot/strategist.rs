//! Fixed-priority move selection for the bot opponent

use crate::board::Board;
use crate::types::Disc;
use rand::seq::SliceRandom;

/// Columns considered "central" for the positional preference step
const CENTER_COLUMNS: std::ops::RangeInclusive<usize> = 2..=4;

/// Number of follow-up winning columns that makes a move a fork
const FORK_THREATS: usize = 2;

/// Stateless move selector. Evaluates a fixed priority list, first match
/// wins: immediate win, immediate block, double-threat setup, central
/// preference, random fallback. All simulation places and immediately
/// retracts the test disc.
#[derive(Debug, Clone, Copy, Default)]
pub struct BotStrategist;

impl BotStrategist {
    pub fn new() -> Self {
        Self
    }

    /// Select a column for `bot_disc` to play. Returns None iff the board
    /// has no legal column left.
    pub fn choose_column(&self, board: &mut Board, bot_disc: Disc) -> Option<usize> {
        let legal = board.legal_columns();
        if legal.is_empty() {
            return None;
        }

        let opponent_disc = bot_disc.other();

        // 1. Take an immediate win
        if let Some(col) = Self::winning_column(board, &legal, bot_disc) {
            return Some(col);
        }

        // 2. Block the opponent's immediate win
        if let Some(col) = Self::winning_column(board, &legal, opponent_disc) {
            return Some(col);
        }

        // 3. Build a fork: a move that leaves two or more winning replies
        if let Some(col) = Self::fork_column(board, &legal, bot_disc) {
            return Some(col);
        }

        let mut rng = rand::thread_rng();

        // 4. Prefer the middle third of the board
        let center: Vec<usize> = legal
            .iter()
            .copied()
            .filter(|col| CENTER_COLUMNS.contains(col))
            .collect();
        if let Some(&col) = center.choose(&mut rng) {
            return Some(col);
        }

        // 5. Any legal column
        legal.choose(&mut rng).copied()
    }

    /// First legal column where placing `disc` wins outright
    fn winning_column(board: &mut Board, legal: &[usize], disc: Disc) -> Option<usize> {
        legal.iter().copied().find(|&col| {
            let row = match board.drop_row(col) {
                Some(row) => row,
                None => return false,
            };
            board.place(row, col, disc);
            let won = board.detect_win(row, col, disc).is_some();
            board.clear(row, col);
            won
        })
    }

    /// First legal column that creates at least [`FORK_THREATS`] distinct
    /// follow-up winning columns for `disc`.
    fn fork_column(board: &mut Board, legal: &[usize], disc: Disc) -> Option<usize> {
        legal.iter().copied().find(|&col| {
            let row = match board.drop_row(col) {
                Some(row) => row,
                None => return false,
            };
            board.place(row, col, disc);
            let threats = Self::count_threats(board, disc);
            board.clear(row, col);
            threats >= FORK_THREATS
        })
    }

    /// Number of legal columns that would be an immediate win for `disc`
    /// in the current position.
    fn count_threats(board: &mut Board, disc: Disc) -> usize {
        let legal = board.legal_columns();
        legal
            .into_iter()
            .filter(|&col| {
                let row = match board.drop_row(col) {
                    Some(row) => row,
                    None => return false,
                };
                board.place(row, col, disc);
                let won = board.detect_win(row, col, disc).is_some();
                board.clear(row, col);
                won
            })
            .count()
    }
}
