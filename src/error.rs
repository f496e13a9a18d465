//! Error types for the game session service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific game session scenarios
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Game not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Game is not active: {session_id}")]
    SessionNotActive { session_id: String },

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid column: {column}")]
    InvalidColumn { column: usize },

    #[error("Column is full: {column}")]
    ColumnFull { column: usize },

    #[error("Reconnect rejected: {reason}")]
    ReconnectRejected { reason: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}

impl GameServerError {
    /// True for errors caused by client input. These are reported back to the
    /// offending client and never mutate session state.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GameServerError::InvalidRequest { .. }
                | GameServerError::SessionNotFound { .. }
                | GameServerError::SessionNotActive { .. }
                | GameServerError::NotYourTurn
                | GameServerError::InvalidColumn { .. }
                | GameServerError::ColumnFull { .. }
                | GameServerError::ReconnectRejected { .. }
        )
    }
}
