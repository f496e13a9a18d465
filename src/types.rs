//! Common types used throughout the game session service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for players; the client-supplied username
pub type PlayerId = String;

/// Unique identifier for game sessions
pub type SessionId = Uuid;

/// Disc color on the board; seat one always plays Red
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disc {
    Red,
    Yellow,
}

impl Disc {
    /// The other color
    pub fn other(self) -> Disc {
        match self {
            Disc::Red => Disc::Yellow,
            Disc::Yellow => Disc::Red,
        }
    }
}

impl std::fmt::Display for Disc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Disc::Red => write!(f, "red"),
            Disc::Yellow => write!(f, "yellow"),
        }
    }
}

/// One of the two playing positions in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    One,
    Two,
}

impl Seat {
    pub fn other(self) -> Seat {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    /// Color assignment is fixed: seat one is Red, seat two is Yellow
    pub fn disc(self) -> Disc {
        match self {
            Seat::One => Disc::Red,
            Seat::Two => Disc::Yellow,
        }
    }

    /// 1-based number used on the wire
    pub fn number(self) -> u8 {
        match self {
            Seat::One => 1,
            Seat::Two => 2,
        }
    }
}

/// Occupant of a seat; seat two may be the built-in bot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeatOccupant {
    Human(PlayerId),
    Bot,
}

// Wire representation matches Display: the username, or "bot"
impl Serialize for SeatOccupant {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SeatOccupant::Human(id) => serializer.serialize_str(id),
            SeatOccupant::Bot => serializer.serialize_str("bot"),
        }
    }
}

impl<'de> Deserialize<'de> for SeatOccupant {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "bot" => SeatOccupant::Bot,
            _ => SeatOccupant::Human(raw),
        })
    }
}

impl SeatOccupant {
    pub fn is_bot(&self) -> bool {
        matches!(self, SeatOccupant::Bot)
    }

    /// The player id when the occupant is human
    pub fn player_id(&self) -> Option<&PlayerId> {
        match self {
            SeatOccupant::Human(id) => Some(id),
            SeatOccupant::Bot => None,
        }
    }
}

impl std::fmt::Display for SeatOccupant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeatOccupant::Human(id) => write!(f, "{}", id),
            SeatOccupant::Bot => write!(f, "bot"),
        }
    }
}

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Seat two unfilled; transient, collapses to Active at creation time
    Waiting,
    Active,
    Completed,
    Forfeited,
}

/// Axis along which a winning run was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinKind {
    Horizontal,
    Vertical,
    Diagonal,
    /// Game ended with a full board and no winning run
    Draw,
    /// Opponent left and the grace window expired
    Forfeit,
}

/// A single board coordinate, row 0 at the top
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Terminal result of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Winning occupant, or None for a draw
    pub winner: Option<SeatOccupant>,
    pub win_kind: WinKind,
    /// Full connected run for the terminal visual trace; empty for draws
    pub winning_cells: Vec<CellPos>,
    /// Whole seconds elapsed since session creation
    pub duration_secs: u64,
}
