//! Health check probes and reporting
//!
//! Readiness and liveness checks over the session engine, plus the
//! detailed report served by the stats endpoint.

use crate::gateway::ChannelRegistry;
use crate::session::SessionEngine;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStats {
    pub active_sessions: usize,
    pub players_waiting: usize,
    pub games_started: u64,
    pub games_completed: u64,
    pub games_forfeited: u64,
    pub connected_clients: usize,
}

/// Health check report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub checks: Vec<ComponentCheck>,
    pub stats: ServiceStats,
}

impl HealthCheck {
    /// Full health check with per-component detail
    pub async fn check(
        service_name: &str,
        engine: &SessionEngine,
        channels: &Arc<ChannelRegistry>,
    ) -> Result<Self> {
        let mut checks = Vec::new();
        let mut overall = HealthStatus::Healthy;

        let engine_check = Self::check_engine(engine);
        if engine_check.status != HealthStatus::Healthy {
            overall = engine_check.status.clone();
        }
        checks.push(engine_check);

        let stats = Self::gather_stats(engine, channels);

        Ok(HealthCheck {
            status: overall,
            service: service_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats,
        })
    }

    /// Liveness: the process is up and the engine lock is reachable
    pub fn liveness_check(engine: &SessionEngine) -> HealthStatus {
        // stats() takes and releases the engine lock; a wedged lock
        // would block here rather than answer.
        let _ = engine.stats();
        HealthStatus::Healthy
    }

    /// Readiness: the engine can serve matchmaking traffic
    pub fn readiness_check(engine: &SessionEngine) -> HealthStatus {
        Self::check_engine(engine).status
    }

    fn check_engine(engine: &SessionEngine) -> ComponentCheck {
        let start = std::time::Instant::now();
        let stats = engine.stats();
        // A completed-counter ahead of the started-counter means state
        // corruption; report degraded so it shows up on dashboards.
        let status = if stats.games_completed + stats.games_forfeited > stats.games_started {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        ComponentCheck {
            name: "session_engine".to_string(),
            status,
            message: None,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_stats(engine: &SessionEngine, channels: &Arc<ChannelRegistry>) -> ServiceStats {
        let stats = engine.stats();
        ServiceStats {
            active_sessions: stats.active_sessions,
            players_waiting: stats.players_waiting,
            games_started: stats.games_started,
            games_completed: stats.games_completed,
            games_forfeited: stats.games_forfeited,
            connected_clients: channels.connected_count(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
