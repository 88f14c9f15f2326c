//! Configuration management and validation.
//!
//! Provides the run configuration: where the race API lives, which race to
//! fetch, where output goes and which optional steps of the run are enabled.
//! Values come from defaults, an optional TOML file and CLI overrides, in
//! that order.

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_OUTPUT_DIR, DEFAULT_RACE_ID, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_REST_DAY_PATTERN,
};
use crate::error::{RaceError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Global configuration for a race processing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Base URL of the race API, without trailing slash
    pub api_base_url: String,

    /// Race identifier in the API
    pub race_id: u32,

    /// Directory receiving JSON snapshots and CSV tables
    pub output_dir: PathBuf,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Fetch the rider roster before the stages
    pub fetch_roster: bool,

    /// Stop after the stage the API reports as current
    pub use_current_stage: bool,

    /// Write one cleaned JSON snapshot per merged stage
    pub write_stage_snapshots: bool,

    /// Stage numbers matching this pattern are rest days
    pub rest_day_pattern: String,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            race_id: DEFAULT_RACE_ID,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            fetch_roster: true,
            use_current_stage: true,
            write_stage_snapshots: true,
            rest_day_pattern: DEFAULT_REST_DAY_PATTERN.to_string(),
        }
    }
}

impl RaceConfig {
    /// Load configuration from a TOML file; absent keys keep their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: RaceConfig = toml::from_str(&text).map_err(|e| {
            RaceError::configuration(format!("invalid config file {}: {}", path.display(), e))
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check the configuration for values the run cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(RaceError::configuration("api_base_url must not be empty"));
        }
        if self.request_timeout_secs == 0 {
            return Err(RaceError::configuration(
                "request_timeout_secs must be greater than zero",
            ));
        }
        self.rest_day_regex()?;
        Ok(())
    }

    pub fn rest_day_regex(&self) -> Result<Regex> {
        Regex::new(&self.rest_day_pattern).map_err(|e| {
            RaceError::configuration(format!(
                "invalid rest_day_pattern '{}': {}",
                self.rest_day_pattern, e
            ))
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Set the API base URL
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the race to fetch
    pub fn with_race_id(mut self, race_id: u32) -> Self {
        self.race_id = race_id;
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Synthesize riders from stage data instead of fetching a roster
    pub fn without_roster(mut self) -> Self {
        self.fetch_roster = false;
        self
    }

    /// Rely only on the stage id sentinel to detect unfinished stages
    pub fn without_current_stage(mut self) -> Self {
        self.use_current_stage = false;
        self
    }

    pub fn without_stage_snapshots(mut self) -> Self {
        self.write_stage_snapshots = false;
        self
    }

    pub fn with_rest_day_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.rest_day_pattern = pattern.into();
        self
    }
}
