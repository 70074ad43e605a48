//! Layered configuration for the cadence CLI
//!
//! Sources are merged in order, later ones winning:
//! 1. Built-in defaults
//! 2. A TOML file: `--config`, else `CADENCE_CONFIG_PATH`, else `cadence.toml`
//!    in the working directory if present
//! 3. `CADENCE_*` environment variables, with `__` between nested keys
//!    (`CADENCE_ENGINE__STEP_LIMIT=50000`)
//! 4. Explicit builder overrides
//!
//! A `.env` file is read first so its variables take part in step 3.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "CADENCE_CONFIG_PATH";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "CADENCE";

/// Looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "cadence";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub log: LogConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub run: RunConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber` filter directive, used when `RUST_LOG` is unset
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Trampoline bounces allowed per resume; unlimited when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Most values `run` pulls from a generator
    pub take: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Turn budget when a task runs on the deterministic turn queue
    pub max_turns: u64,
}

impl Config {
    /// Load with no overrides
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Render the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<String>,
    step_limit: Option<u64>,
    log_filter: Option<String>,
    skip_env: bool,
}

impl ConfigBuilder {
    /// Read this file instead of searching for one. It must exist.
    pub fn config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn step_limit(mut self, limit: Option<u64>) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Ignore `.env` and `CADENCE_*` variables
    pub fn skip_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn build(self) -> Result<Config> {
        if !self.skip_env {
            // A missing .env is not an error
            let _ = dotenvy::dotenv();
        }

        let mut builder = config::Config::builder()
            .set_default("log.filter", "info")?
            .set_default("run.take", 100)?
            .set_default("scheduler.max_turns", 100_000)?;

        let path = match self.config_path {
            Some(path) => Some(path),
            None if !self.skip_env => std::env::var(CONFIG_PATH_ENV).ok(),
            None => None,
        };

        builder = match &path {
            Some(path) => {
                debug!(path = %path, "reading config file");
                builder.add_source(config::File::from(PathBuf::from(path)).required(true))
            }
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        if !self.skip_env {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        if let Some(limit) = self.step_limit {
            builder = builder.set_override("engine.step_limit", limit)?;
        }
        if let Some(filter) = self.log_filter {
            builder = builder.set_override("log.filter", filter)?;
        }

        let config: Config = builder
            .build()
            .with_context(|| match &path {
                Some(path) => format!("Failed to load configuration from {}", path),
                None => "Failed to load configuration".to_string(),
            })?
            .try_deserialize()
            .context("Invalid configuration")?;

        Ok(config)
    }
}
