//! Configuration management for the game session service
//!
//! This module handles configuration loading from environment variables
//! and TOML files, validation, and default values.

pub mod app;

pub use app::{validate_config, AppConfig, ServiceSettings, TimingSettings};
