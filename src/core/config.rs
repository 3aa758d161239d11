//! Pipeline tuning: pool sizing, idle teardown delay, file concurrency.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::ConfigError;

const ENV_IDLE_TIMEOUT_MS: &str = "IMAGE_PIPELINE_IDLE_TIMEOUT_MS";
const ENV_POOL_WORKERS: &str = "IMAGE_PIPELINE_POOL_WORKERS";
const ENV_MAX_CONCURRENT_FILES: &str = "IMAGE_PIPELINE_MAX_CONCURRENT_FILES";

/// Tunable constants for the pool manager and the stream adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Quiet period after the last release before the pool is torn down
    pub idle_timeout_ms: u64,
    /// Explicit engine worker count; detected from the CPU count when unset
    pub pool_workers: Option<usize>,
    /// Upper bound for the detected worker count, to bound memory use
    pub max_pool_workers: usize,
    /// Files allowed between decode and emit at the same time
    pub max_concurrent_files: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: 500,
            pool_workers: None,
            max_pool_workers: 2,
            max_concurrent_files: 2,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        debug!("Loaded pipeline config from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Applies `IMAGE_PIPELINE_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(ENV_IDLE_TIMEOUT_MS) {
            self.idle_timeout_ms = parse_env(ENV_IDLE_TIMEOUT_MS, value)?;
        }
        if let Some(value) = lookup(ENV_POOL_WORKERS) {
            self.pool_workers = Some(parse_env(ENV_POOL_WORKERS, value)?);
        }
        if let Some(value) = lookup(ENV_MAX_CONCURRENT_FILES) {
            self.max_concurrent_files = parse_env(ENV_MAX_CONCURRENT_FILES, value)?;
        }
        Ok(self)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Worker count for a newly created engine pool, never below 1.
    pub fn pool_workers(&self) -> usize {
        match self.pool_workers {
            Some(workers) => workers.max(1),
            None => num_cpus::get().clamp(1, self.max_pool_workers.max(1)),
        }
    }

    pub fn max_concurrent_files(&self) -> usize {
        self.max_concurrent_files.max(1)
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { name, value })
}
