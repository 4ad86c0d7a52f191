//! Tailing configuration.
//!
//! Polling intervals and limits default to the values the engine was designed
//! around; a TOML file can override any of them. AWS region and profile can
//! also come from `RACKLOG_REGION` / `RACKLOG_PROFILE`.

#![warn(clippy::all, rust_2018_idioms)]

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use aws_types::region::Region;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::app::log_tail::LogSourceSpec;

pub const REGION_ENV: &str = "RACKLOG_REGION";
pub const PROFILE_ENV: &str = "RACKLOG_PROFILE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TailConfig {
    /// Stream listing and stream reads (milliseconds)
    pub poll_interval_ms: u64,
    /// Extra sleep after a failed stream listing (milliseconds)
    pub discovery_backoff_ms: u64,
    /// Shard record fetches (milliseconds)
    pub shard_poll_interval_ms: u64,
    /// Database log file downloads (milliseconds)
    pub file_poll_interval_ms: u64,
    /// How far back a stream's last event may be and still count as active (seconds)
    pub discovery_horizon_secs: u64,
    /// Lines of the current database log file emitted when tailing starts
    pub seed_lines: i32,
    /// Page size when listing database log files
    pub log_file_page_size: i32,
    /// Bound on buffered output lines; unbounded when absent
    pub sink_capacity: Option<usize>,
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Source to tail when none is given on the command line
    pub source: Option<LogSourceSpec>,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            discovery_backoff_ms: 1000,
            shard_poll_interval_ms: 500,
            file_poll_interval_ms: 1000,
            discovery_horizon_secs: 120,
            seed_lines: 50,
            log_file_page_size: 100,
            sink_capacity: None,
            region: None,
            profile: None,
            source: None,
        }
    }
}

impl TailConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Override region and profile from the environment
    pub fn apply_env(mut self) -> Self {
        if let Ok(region) = std::env::var(REGION_ENV) {
            if !region.is_empty() {
                self.region = Some(region);
            }
        }
        if let Ok(profile) = std::env::var(PROFILE_ENV) {
            if !profile.is_empty() {
                self.profile = Some(profile);
            }
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn discovery_backoff(&self) -> Duration {
        Duration::from_millis(self.discovery_backoff_ms)
    }

    pub fn shard_poll_interval(&self) -> Duration {
        Duration::from_millis(self.shard_poll_interval_ms)
    }

    pub fn file_poll_interval(&self) -> Duration {
        Duration::from_millis(self.file_poll_interval_ms)
    }

    pub fn discovery_horizon(&self) -> Duration {
        Duration::from_secs(self.discovery_horizon_secs)
    }

    /// Load the shared AWS SDK configuration, honouring region/profile overrides
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        loader.load().await
    }
}
