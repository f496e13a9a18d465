//! Waiting-player queue state

use crate::types::PlayerId;
use crate::utils::current_timestamp;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// A waiting player between join and pairing or bot-timeout
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub player: PlayerId,
    pub enqueued_at: DateTime<Utc>,
}

/// Result of a join attempt
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// Paired with the earliest-arrived waiting player, who takes seat one
    Matched { opponent: PlayerId },
    /// Nobody waiting; the joiner now holds a queue entry
    Enqueued,
    /// The joiner was already queued; treated as a no-op
    AlreadyQueued,
}

/// FIFO queue of players waiting for an opponent. A player holds at most
/// one entry at any time.
#[derive(Debug, Default)]
pub struct MatchQueue {
    entries: VecDeque<QueueEntry>,
}

impl MatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair the joiner with the earliest waiting entry, or enqueue them.
    /// A duplicate join while already queued is idempotently ignored.
    pub fn join(&mut self, player: &PlayerId) -> JoinOutcome {
        if self.contains(player) {
            return JoinOutcome::AlreadyQueued;
        }

        if let Some(waiting) = self.entries.pop_front() {
            return JoinOutcome::Matched {
                opponent: waiting.player,
            };
        }

        self.entries.push_back(QueueEntry {
            player: player.clone(),
            enqueued_at: current_timestamp(),
        });
        JoinOutcome::Enqueued
    }

    /// Remove a player's entry if present; true when something was removed.
    /// Used both by the bot-match deadline and by disconnect handling.
    pub fn remove(&mut self, player: &PlayerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.player != player);
        self.entries.len() != before
    }

    /// Whether the player currently holds a queue entry
    pub fn contains(&self, player: &PlayerId) -> bool {
        self.entries.iter().any(|entry| &entry.player == player)
    }

    /// Number of waiting players
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
