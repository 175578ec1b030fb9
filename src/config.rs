//! Engine configuration

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub recommendations: RecommendationConfig,
    #[serde(default)]
    pub trending: TrendingConfig,
    #[serde(default)]
    pub bookmarks: BookmarkConfig,
}

impl DiscoveryConfig {
    /// Load from a TOML file, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Directory service connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the directory REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            api_token: None,
        }
    }
}

/// What to keep when part of a recommendation refresh fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Any failure empties the whole result
    #[default]
    AllOrNothing,
    /// A failed backfill keeps the personalized prefix
    KeepPersonalized,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingConfig {
    /// Carousel advance interval in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// How many shuffled catalog entries form the trending sequence
    #[serde(default = "default_sequence_limit")]
    pub sequence_limit: usize,
}

impl TrendingConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            sequence_limit: default_sequence_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkConfig {
    /// Delay before a removed entry leaves the saved list
    #[serde(default = "default_grace")]
    pub grace_ms: u64,

    /// How long a notification stays visible
    #[serde(default = "default_notification")]
    pub notification_ms: u64,
}

impl BookmarkConfig {
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ms)
    }
}

impl Default for BookmarkConfig {
    fn default() -> Self {
        Self {
            grace_ms: default_grace(),
            notification_ms: default_notification(),
        }
    }
}

// Defaults
fn default_base_url() -> String { "http://localhost:5000".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_tick_interval() -> u64 { 2000 }
fn default_sequence_limit() -> usize { 10 }
fn default_grace() -> u64 { 300 }
fn default_notification() -> u64 { 2500 }
