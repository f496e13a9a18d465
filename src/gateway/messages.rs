//! Channel message contract
//!
//! Wire types for the bidirectional client channel. Field names follow
//! the client protocol (camelCase on the wire), independent of the
//! internal representation.

use crate::session::instance::Session;
use crate::types::{CellPos, Disc, SessionId, SessionStatus, WinKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbound messages from a client. Disconnect is transport-level and has
/// no payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    JoinGame {
        username: String,
    },
    MakeMove {
        #[serde(rename = "gameId")]
        game_id: SessionId,
        column: usize,
    },
    ReconnectGame {
        username: String,
        #[serde(rename = "gameId")]
        game_id: SessionId,
    },
}

/// Immutable view of a session handed to clients and collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: SessionId,
    /// Seat occupants in seat order; the bot appears as "bot"
    pub players: Vec<String>,
    pub status: SessionStatus,
    pub board: Vec<Vec<Option<Disc>>>,
    #[serde(rename = "currentTurn")]
    pub current_turn: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<&Session> for GameSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id(),
            players: vec![
                session.seat_one().clone(),
                session.seat_two().to_string(),
            ],
            status: session.status(),
            board: session.board().rows(),
            current_turn: session.current_occupant().to_string(),
            created_at: session.created_at(),
        }
    }
}

/// Outbound messages to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    WaitingForOpponent {
        message: String,
    },
    GameStarted {
        game: GameSnapshot,
        #[serde(rename = "playerNumber")]
        player_number: u8,
        color: Disc,
        opponent: String,
    },
    MoveMade {
        row: usize,
        column: usize,
        color: Disc,
        #[serde(rename = "nextTurn")]
        next_turn: String,
        board: Vec<Vec<Option<Disc>>>,
    },
    GameEnded {
        /// Winning occupant, or None for a draw
        winner: Option<String>,
        #[serde(rename = "winType")]
        win_type: WinKind,
        board: Vec<Vec<Option<Disc>>>,
        /// Whole seconds since the session was created
        duration: u64,
        #[serde(rename = "winningCells")]
        winning_cells: Vec<CellPos>,
    },
    GameReconnected {
        game: GameSnapshot,
        #[serde(rename = "playerNumber")]
        player_number: u8,
    },
    Error {
        message: String,
    },
}
