//! Board engine for the 6x7 connect-four grid
//!
//! Pure placement, win-detection, and legal-move logic. No session state
//! lives here; the session layer owns the boards it mutates.

pub mod engine;

pub use engine::{Board, WinLine, COLS, ROWS, WIN_LENGTH};
