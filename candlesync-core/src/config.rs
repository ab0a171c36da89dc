//! Engine configuration loaded from a TOML file.
//!
//! One section per component. Every section and every field is optional;
//! anything missing falls back to the defaults the component structs carry,
//! so an empty file configures a working engine. Durations live in the file
//! as plain integers (`*_secs`, `*_ms`) and convert in the accessors.

use crate::gateway::GatewayConfig;
use crate::retry::{Backoff, RetryPolicy};
use crate::sync::SyncOptions;
use crate::throttle::ThrottleConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Read(String),
    #[error("parse config TOML: {0}")]
    Parse(String),
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncConfig {
    pub gateway: GatewaySection,
    pub throttle: ThrottleSection,
    pub retry: RetrySection,
    pub sync: SyncSection,
}

/// `[gateway]` — connection to the local gateway daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewaySection {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11111,
            timeout_secs: 30,
        }
    }
}

/// `[throttle]` — request pacing under the gateway quota.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThrottleSection {
    pub max_requests: u32,
    pub window_secs: u64,
    pub penalty_ms: u64,
}

impl Default for ThrottleSection {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_secs: 30,
            penalty_ms: 1_000,
        }
    }
}

/// `[retry]` — per-page retry budget and backoff schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay_ms: 1_000,
            factor: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

/// `[sync]` — window depth, pacing and storage location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SyncSection {
    pub data_dir: PathBuf,
    pub lookback_years: u32,
    pub incremental_days: u32,
    pub page_size: usize,
    pub year_pause_ms: u64,
    pub symbol_pause_ms: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            lookback_years: 2,
            incremental_days: 30,
            page_size: 1_000,
            year_pause_ms: 600,
            symbol_pause_ms: 500,
        }
    }
}

impl SyncConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            host: self.gateway.host.clone(),
            port: self.gateway.port,
            timeout: Duration::from_secs(self.gateway.timeout_secs),
        }
    }

    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig {
            max_requests: self.throttle.max_requests,
            window: Duration::from_secs(self.throttle.window_secs),
            penalty: Duration::from_millis(self.throttle.penalty_ms),
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            backoff: Backoff::Exponential {
                base: Duration::from_millis(self.retry.base_delay_ms),
                factor: self.retry.factor,
                max: Duration::from_millis(self.retry.max_delay_ms),
            },
        }
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            lookback_years: self.sync.lookback_years,
            incremental_days: self.sync.incremental_days,
            year_pause: Duration::from_millis(self.sync.year_pause_ms),
            symbol_pause: Duration::from_millis(self.sync.symbol_pause_ms),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.sync.data_dir
    }

    pub fn page_size(&self) -> usize {
        self.sync.page_size
    }
}
