//! Main application state and service coordination
//!
//! Wires the session engine, gateway listener, and health server
//! together and manages their lifecycle and background tasks.

use crate::config::AppConfig;
use crate::gateway::{ChannelRegistry, Gateway, GatewayListener, ListenerConfig};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector};
use crate::service::health::HealthCheck;
use crate::session::{EngineStats, SessionEngine};
use crate::storage::analytics::LoggingAnalyticsSink;
use crate::storage::persistence::InMemoryGameStore;
use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    config: AppConfig,
    engine: SessionEngine,
    channels: Arc<ChannelRegistry>,
    listener: Arc<GatewayListener>,
    health_server: Arc<HealthServer>,
    background_tasks: Vec<JoinHandle<()>>,
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing game session service");
        info!(
            "Configuration: service={}, listen_port={}, health_port={}",
            config.service.name, config.service.listen_port, config.service.health_port
        );

        let metrics = MetricsCollector::new().map_err(|e| ServiceError::Initialization {
            message: format!("Failed to create metrics collector: {}", e),
        })?;

        let channels = Arc::new(ChannelRegistry::new());
        let engine = SessionEngine::new(
            channels.clone(),
            Arc::new(InMemoryGameStore::new()),
            Arc::new(LoggingAnalyticsSink::new()),
            metrics.clone(),
            config.timing.clone(),
        );

        let listener = Arc::new(GatewayListener::new(
            ListenerConfig {
                port: config.service.listen_port,
                host: "0.0.0.0".to_string(),
            },
            Gateway::new(engine.clone(), channels.clone()),
        ));

        let health_server = Arc::new(
            HealthServer::new(
                HealthServerConfig {
                    port: config.service.health_port,
                    host: "0.0.0.0".to_string(),
                },
                metrics,
            )
            .with_service_name(config.service.name.clone())
            .with_engine(engine.clone(), channels.clone()),
        );

        Ok(Self {
            config,
            engine,
            channels,
            listener,
            health_server,
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start all background services
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting game session service");

        *self.is_running.write().await = true;

        let health_server = self.health_server.clone();
        self.background_tasks.push(tokio::spawn(async move {
            if let Err(e) = health_server.start().await {
                error!("Health server failed: {}", e);
            }
        }));

        let listener = self.listener.clone();
        self.background_tasks.push(tokio::spawn(async move {
            if let Err(e) = listener.start().await {
                error!("Gateway listener failed: {}", e);
            }
        }));

        // Give the servers a moment to bind
        tokio::time::sleep(Duration::from_millis(100)).await;

        info!("Game session service started");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown");

        *self.is_running.write().await = false;

        if let Err(e) = self.listener.stop().await {
            warn!("Failed to stop gateway listener: {}", e);
        }
        if let Err(e) = self.health_server.stop().await {
            warn!("Failed to stop health server: {}", e);
        }

        self.stop_background_tasks().await;

        let final_stats = self.engine.stats();
        info!("Final service statistics: {:?}", final_stats);
        info!("Game session service shutdown completed");

        Ok(())
    }

    async fn stop_background_tasks(&mut self) {
        let timeout = Duration::from_secs(self.config.service.shutdown_timeout_seconds);
        for handle in self.background_tasks.drain(..) {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Background task panicked: {}", e),
                Err(_) => warn!("Background task did not stop within {:?}", timeout),
            }
        }
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the session engine for operations
    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    /// Current engine counters
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Full health report for this service instance
    pub async fn health(&self) -> Result<HealthCheck> {
        HealthCheck::check(&self.config.service.name, &self.engine, &self.channels).await
    }
}
