//! Configuration loading for the mirror client.
//!
//! All client settings can be loaded from a TOML configuration file. Every
//! section is optional and falls back to the values the client ships with.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Complete client configuration.
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Simulation endpoint and reconnect policy
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Outgoing step command cadence
    #[serde(default)]
    pub cadence: CadenceConfig,
    /// Interpolation and placement settings
    #[serde(default)]
    pub presentation: PresentationConfig,
}

impl ClientConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Rejects values the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.host.trim().is_empty() {
            return Err(ConfigError::Invalid("connection.host is empty".into()));
        }
        if self.connection.port == 0 {
            return Err(ConfigError::Invalid("connection.port must be non-zero".into()));
        }
        if self.connection.backoff_initial_ms == 0
            || self.connection.backoff_max_ms < self.connection.backoff_initial_ms
        {
            return Err(ConfigError::Invalid(
                "connection backoff must satisfy 0 < initial <= max".into(),
            ));
        }
        if !(self.cadence.step_interval_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "cadence.step_interval_secs must be positive".into(),
            ));
        }
        let p = &self.presentation;
        if !(p.move_rate > 0.0) || !(p.rotation_rate > 0.0) {
            return Err(ConfigError::Invalid(
                "presentation rates must be positive".into(),
            ));
        }
        if !(p.motion_threshold >= 0.0) {
            return Err(ConfigError::Invalid(
                "presentation.motion_threshold must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Simulation endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    /// Reconnect with exponential backoff after the link drops
    pub reconnect: bool,
    /// First reconnect delay
    pub backoff_initial_ms: u64,
    /// Upper bound for the reconnect delay
    pub backoff_max_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8765,
            reconnect: true,
            backoff_initial_ms: 1_000,
            backoff_max_ms: 30_000,
        }
    }
}

impl ConnectionConfig {
    /// WebSocket URL of the simulation endpoint.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

/// Step command cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Seconds of render time between two step commands
    pub step_interval_secs: f32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            step_interval_secs: 0.1,
        }
    }
}

/// Interpolation and placement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    /// Exponential smoothing rate for position, per second
    pub move_rate: f32,
    /// Exponential smoothing rate for orientation, per second
    pub rotation_rate: f32,
    /// Yaw added to the movement direction to match the model's forward axis
    pub heading_offset_degrees: f32,
    /// Squared planar distance below which a vehicle keeps its orientation
    pub motion_threshold: f32,
    /// Vertical coordinate of the render plane
    pub ground_height: f32,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            move_rate: 10.0,
            rotation_rate: 10.0,
            heading_offset_degrees: 90.0,
            motion_threshold: 0.01,
            ground_height: 0.0,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Mirror client configuration

[connection]
host = "localhost"
port = 8765
reconnect = true
backoff_initial_ms = 1000
backoff_max_ms = 30000

[cadence]
step_interval_secs = 0.1

[presentation]
move_rate = 10.0
rotation_rate = 10.0
heading_offset_degrees = 90.0
motion_threshold = 0.01
ground_height = 0.0
"#
    .to_string()
}
