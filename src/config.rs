//! Configuration types for ticker-feed

use crate::feed::{FeedClientConfig, HeartbeatConfig, ReconnectConfig};
use crate::telemetry::LogFormat;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Public Coinbase Exchange market data feed
pub const DEFAULT_FEED_URL: &str = "wss://ws-feed.exchange.coinbase.com";

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    #[serde(default)]
    pub heartbeat: HeartbeatSettings,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Feed endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// WebSocket URL of the feed
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Products to watch when none are given on the command line
    #[serde(default = "default_product_ids")]
    pub product_ids: Vec<String>,
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}
fn default_product_ids() -> Vec<String> {
    vec!["BTC-USD".to_string(), "ETH-USD".to_string()]
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            product_ids: default_product_ids(),
        }
    }
}

/// Reconnection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectSettings {
    /// Consecutive reconnect attempts before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff unit in milliseconds; attempt n waits n units
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}
fn default_base_delay_ms() -> u64 {
    1000
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
        }
    }
}

/// Heartbeat configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatSettings {
    /// Keep-alive interval in milliseconds
    #[serde(default = "default_heartbeat_interval_ms")]
    pub interval_ms: u64,
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            interval_ms: 30_000,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; no exporter when unset
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.heartbeat.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat.interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Connection manager settings
    pub fn client_config(&self) -> FeedClientConfig {
        FeedClientConfig {
            reconnect: ReconnectConfig::new(
                self.reconnect.max_attempts,
                Duration::from_millis(self.reconnect.base_delay_ms),
            ),
            heartbeat: HeartbeatConfig::new(Duration::from_millis(self.heartbeat.interval_ms)),
        }
    }
}
