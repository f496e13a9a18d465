//! Service layer for the game session service
//!
//! Main application state, service coordination, and health probes.

pub mod app;
pub mod health;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
