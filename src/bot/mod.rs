//! Heuristic bot opponent
//!
//! The bot substitutes for a human when the matchmaking queue times out.
//! Move selection is a fixed-priority heuristic over the board engine.

pub mod strategist;

pub use strategist::BotStrategist;
