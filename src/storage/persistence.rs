//! Persistence collaborator for player and game records

use crate::error::{GameServerError, Result};
use crate::types::{SessionId, SessionStatus, WinKind};
use crate::utils::current_timestamp;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Durable player record with win/loss/draw tallies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub username: String,
    pub games_won: u64,
    pub games_lost: u64,
    pub games_drawn: u64,
    pub created_at: DateTime<Utc>,
}

impl PlayerRecord {
    fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            games_won: 0,
            games_lost: 0,
            games_drawn: 0,
            created_at: current_timestamp(),
        }
    }
}

/// Durable session record created at game start and finalized at the end
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: SessionId,
    pub player_one: String,
    /// Seat two as displayed; "bot" for bot matches
    pub player_two: String,
    pub vs_bot: bool,
    pub status: SessionStatus,
    pub winner: Option<String>,
    pub win_kind: Option<WinKind>,
    pub duration_secs: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// How a terminal session counts toward a player's tallies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerResult {
    Win,
    Loss,
    Draw,
}

/// Trait for the durable storage collaborator. Implementations own their
/// failure handling; the engine never awaits these calls on the session
/// mutation path.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Find a player by username, creating the record on first sighting.
    /// The bool is true when the record was newly created.
    async fn find_or_create_player(&self, username: &str) -> Result<(PlayerRecord, bool)>;

    /// Record a newly started session
    async fn record_game_started(&self, record: GameRecord) -> Result<()>;

    /// Finalize a session record on completion or forfeiture
    async fn finalize_game(
        &self,
        id: SessionId,
        status: SessionStatus,
        winner: Option<String>,
        win_kind: WinKind,
        duration_secs: u64,
    ) -> Result<()>;

    /// Increment a player's win/loss/draw counter
    async fn record_result(&self, username: &str, result: PlayerResult) -> Result<()>;

    /// Look up a player record
    async fn get_player(&self, username: &str) -> Result<Option<PlayerRecord>>;

    /// Look up a game record
    async fn get_game(&self, id: &SessionId) -> Result<Option<GameRecord>>;
}

/// In-memory store used in development and tests. Mirrors the shape a
/// database-backed implementation would take.
#[derive(Debug, Default)]
pub struct InMemoryGameStore {
    players: RwLock<HashMap<String, PlayerRecord>>,
    games: RwLock<HashMap<SessionId, GameRecord>>,
}

impl InMemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for InMemoryGameStore {
    async fn find_or_create_player(&self, username: &str) -> Result<(PlayerRecord, bool)> {
        let mut players = self
            .players
            .write()
            .map_err(|_| GameServerError::InternalError {
                message: "Failed to acquire players lock".to_string(),
            })?;

        if let Some(record) = players.get(username) {
            return Ok((record.clone(), false));
        }
        let record = PlayerRecord::new(username);
        players.insert(username.to_string(), record.clone());
        Ok((record, true))
    }

    async fn record_game_started(&self, record: GameRecord) -> Result<()> {
        let mut games = self
            .games
            .write()
            .map_err(|_| GameServerError::InternalError {
                message: "Failed to acquire games lock".to_string(),
            })?;
        games.insert(record.id, record);
        Ok(())
    }

    async fn finalize_game(
        &self,
        id: SessionId,
        status: SessionStatus,
        winner: Option<String>,
        win_kind: WinKind,
        duration_secs: u64,
    ) -> Result<()> {
        let mut games = self
            .games
            .write()
            .map_err(|_| GameServerError::InternalError {
                message: "Failed to acquire games lock".to_string(),
            })?;

        let record = games
            .get_mut(&id)
            .ok_or_else(|| GameServerError::SessionNotFound {
                session_id: id.to_string(),
            })?;
        record.status = status;
        record.winner = winner;
        record.win_kind = Some(win_kind);
        record.duration_secs = Some(duration_secs);
        record.completed_at = Some(current_timestamp());
        Ok(())
    }

    async fn record_result(&self, username: &str, result: PlayerResult) -> Result<()> {
        let mut players = self
            .players
            .write()
            .map_err(|_| GameServerError::InternalError {
                message: "Failed to acquire players lock".to_string(),
            })?;

        let record = players
            .entry(username.to_string())
            .or_insert_with(|| PlayerRecord::new(username));
        match result {
            PlayerResult::Win => record.games_won += 1,
            PlayerResult::Loss => record.games_lost += 1,
            PlayerResult::Draw => record.games_drawn += 1,
        }
        Ok(())
    }

    async fn get_player(&self, username: &str) -> Result<Option<PlayerRecord>> {
        let players = self
            .players
            .read()
            .map_err(|_| GameServerError::InternalError {
                message: "Failed to acquire players lock".to_string(),
            })?;
        Ok(players.get(username).cloned())
    }

    async fn get_game(&self, id: &SessionId) -> Result<Option<GameRecord>> {
        let games = self
            .games
            .read()
            .map_err(|_| GameServerError::InternalError {
                message: "Failed to acquire games lock".to_string(),
            })?;
        Ok(games.get(id).cloned())
    }
}
