//! External collaborator interfaces
//!
//! Durable storage and the analytics sink are collaborators, not part of
//! the core: every call is best-effort and fire-and-forget from the
//! perspective of session progression. Failures are logged and never
//! roll back in-memory session state.

pub mod analytics;
pub mod persistence;

pub use analytics::{AnalyticsEvent, AnalyticsSink, LoggingAnalyticsSink, NullAnalyticsSink};
pub use persistence::{GameRecord, GameStore, InMemoryGameStore, PlayerRecord, PlayerResult};
