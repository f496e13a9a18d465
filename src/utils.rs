//! Utility functions for the game session service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique session ID
pub fn generate_session_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds elapsed since the given instant, clamped at zero
pub fn elapsed_secs(since: DateTime<Utc>) -> u64 {
    (current_timestamp() - since).num_seconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        let id1 = generate_session_id();
        let id2 = generate_session_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_elapsed_secs_never_negative() {
        let future = current_timestamp() + chrono::Duration::seconds(60);
        assert_eq!(elapsed_secs(future), 0);
    }
}
