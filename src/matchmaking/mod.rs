//! Matchmaking queue for pairing anonymous players
//!
//! Joiners are paired with the earliest waiting player, or handed a bot
//! opponent when nobody shows up within the bot-match window. Deadline
//! timers live in the session engine; the queue itself is pure state.

pub mod queue;

pub use queue::{JoinOutcome, MatchQueue, QueueEntry};
