//! Fourline - realtime connect-four session service
//!
//! This crate provides matchmaking, per-session turn handling, a
//! heuristic bot opponent, and disconnect/reconnect handling for
//! connect-four games over a JSON message channel.

pub mod board;
pub mod bot;
pub mod config;
pub mod error;
pub mod gateway;
pub mod matchmaking;
pub mod metrics;
pub mod service;
pub mod session;
pub mod storage;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{GameServerError, Result};
pub use types::*;

// Re-export key components
pub use gateway::{ClientNotifier, Gateway, GatewayListener};
pub use session::SessionEngine;
pub use storage::{AnalyticsSink, GameStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
