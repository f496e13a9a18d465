//! Fire-and-forget analytics event sink

use crate::error::Result;
use crate::types::{Disc, SessionId, WinKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Lifecycle events published for aggregate statistics. Payload field
/// names follow the analytics pipeline's existing schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    PlayerCreated {
        username: String,
    },
    GameStarted {
        #[serde(rename = "gameId")]
        game_id: SessionId,
        #[serde(rename = "player1")]
        player_one: String,
        #[serde(rename = "player2")]
        player_two: String,
        #[serde(rename = "vsBot")]
        vs_bot: bool,
    },
    MoveMade {
        #[serde(rename = "gameId")]
        game_id: SessionId,
        /// Mover as displayed; "bot" for bot moves
        player: String,
        column: usize,
        row: usize,
        color: Disc,
    },
    GameEnded {
        #[serde(rename = "gameId")]
        game_id: SessionId,
        winner: Option<String>,
        loser: Option<String>,
        #[serde(rename = "winType")]
        win_type: WinKind,
        duration: u64,
        #[serde(rename = "vsBot")]
        vs_bot: bool,
    },
}

impl AnalyticsEvent {
    /// Event name used for routing and counting
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::PlayerCreated { .. } => "player_created",
            AnalyticsEvent::GameStarted { .. } => "game_started",
            AnalyticsEvent::MoveMade { .. } => "move_made",
            AnalyticsEvent::GameEnded { .. } => "game_ended",
        }
    }
}

/// Trait for the analytics collaborator. Delivery is not guaranteed and
/// the core never awaits confirmation on the session mutation path.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn publish(&self, event: AnalyticsEvent) -> Result<()>;
}

/// Sink that writes events to the structured log. Stands in for a real
/// event pipeline in development.
#[derive(Debug, Default)]
pub struct LoggingAnalyticsSink;

impl LoggingAnalyticsSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnalyticsSink for LoggingAnalyticsSink {
    async fn publish(&self, event: AnalyticsEvent) -> Result<()> {
        let payload = serde_json::to_string(&event)?;
        info!("analytics event: {}", payload);
        Ok(())
    }
}

/// Sink that discards everything
#[derive(Debug, Default)]
pub struct NullAnalyticsSink;

impl NullAnalyticsSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnalyticsSink for NullAnalyticsSink {
    async fn publish(&self, _event: AnalyticsEvent) -> Result<()> {
        Ok(())
    }
}
