//! Main application configuration
//!
//! Defines the primary configuration structures for the game session
//! service, including environment variable loading and validation.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub timing: TimingSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for the client channel listener
    pub listen_port: u16,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Gameplay timing settings. The source constants for these windows were
/// inconsistent, so they are configuration, not fixed behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    /// How long a lone player waits before being matched with the bot
    pub bot_match_delay_seconds: u64,
    /// Grace window after a disconnect before the session is forfeited
    pub grace_period_seconds: u64,
    /// Artificial think delay before a scheduled bot move
    pub bot_think_delay_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "fourline".to_string(),
            log_level: "info".to_string(),
            listen_port: 4000,
            health_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            bot_match_delay_seconds: 30,
            grace_period_seconds: 30,
            bot_think_delay_ms: 500,
        }
    }
}

impl TimingSettings {
    pub fn bot_match_delay(&self) -> Duration {
        Duration::from_secs(self.bot_match_delay_seconds)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_seconds)
    }

    pub fn bot_think_delay(&self) -> Duration {
        Duration::from_millis(self.bot_think_delay_ms)
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to
    /// defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(port) = env::var("LISTEN_PORT") {
            config.service.listen_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid LISTEN_PORT value: {}", port))?;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            config.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }
        if let Ok(delay) = env::var("BOT_MATCH_DELAY_SECONDS") {
            config.timing.bot_match_delay_seconds = delay
                .parse()
                .map_err(|_| anyhow!("Invalid BOT_MATCH_DELAY_SECONDS value: {}", delay))?;
        }
        if let Ok(grace) = env::var("GRACE_PERIOD_SECONDS") {
            config.timing.grace_period_seconds = grace
                .parse()
                .map_err(|_| anyhow!("Invalid GRACE_PERIOD_SECONDS value: {}", grace))?;
        }
        if let Ok(think) = env::var("BOT_THINK_DELAY_MS") {
            config.timing.bot_think_delay_ms = think
                .parse()
                .map_err(|_| anyhow!("Invalid BOT_THINK_DELAY_MS value: {}", think))?;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply env overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        validate_config(&config)?;
        Ok(config)
    }
}

/// Validate a complete configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.service.name.is_empty() {
        return Err(anyhow!("Service name cannot be empty"));
    }
    if config.service.listen_port == config.service.health_port {
        return Err(anyhow!(
            "Listener and health ports must differ (both are {})",
            config.service.listen_port
        ));
    }
    if config.timing.bot_match_delay_seconds == 0 {
        return Err(anyhow!("bot_match_delay_seconds must be positive"));
    }
    if config.timing.grace_period_seconds == 0 {
        return Err(anyhow!("grace_period_seconds must be positive"));
    }
    if config.timing.bot_think_delay_ms == 0 {
        return Err(anyhow!("bot_think_delay_ms must be positive"));
    }
    Ok(())
}
