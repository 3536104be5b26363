//! Server configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use strata_common::constants::{
    DEFAULT_ITERATOR_BATCH_SIZE, DEFAULT_MAX_CONCURRENCY, DEFAULT_SEGMENT_SIZE,
    DEFAULT_TRIGGER_LATENESS_MS,
};
use strata_common::error::StrataResult;
use strata_engine::StoreOptions;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Connection cap; doubles as the thread-registry capacity.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Records (or alerts) returned per iterator pull.
    #[serde(default = "default_iterator_batch_size")]
    pub iterator_batch_size: usize,

    /// Lateness threshold for trigger evaluation, in milliseconds.
    #[serde(default = "default_trigger_lateness_ms")]
    pub trigger_lateness_ms: u64,

    /// Data directory for durable tables.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Segment capacity for table logs, in bytes.
    #[serde(default = "default_segment_size")]
    pub segment_size: usize,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_iterator_batch_size() -> usize {
    DEFAULT_ITERATOR_BATCH_SIZE
}

fn default_trigger_lateness_ms() -> u64 {
    DEFAULT_TRIGGER_LATENESS_MS
}

fn default_segment_size() -> usize {
    DEFAULT_SEGMENT_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            iterator_batch_size: default_iterator_batch_size(),
            trigger_lateness_ms: default_trigger_lateness_ms(),
            data_dir: None,
            segment_size: default_segment_size(),
        }
    }
}

impl ServerConfig {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> StrataResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content).map_err(invalid_data)?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    pub fn save(&self, path: &Path) -> StrataResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Renders the configuration as TOML.
    pub fn to_toml(&self) -> StrataResult<String> {
        toml::to_string_pretty(self).map_err(invalid_data)
    }

    /// Returns the engine options derived from this configuration.
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            data_dir: self.data_dir.clone(),
            segment_size: self.segment_size,
            trigger_lateness: Duration::from_millis(self.trigger_lateness_ms),
            ..StoreOptions::default()
        }
    }

    /// Creates a builder for configuration.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }
}

fn invalid_data<E: std::error::Error + Send + Sync + 'static>(e: E) -> strata_common::StrataError {
    std::io::Error::new(std::io::ErrorKind::InvalidData, e).into()
}

/// Builder for server configuration.
#[derive(Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the connection cap.
    #[must_use]
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.config.max_concurrency = max;
        self
    }

    /// Sets the iterator batch size.
    #[must_use]
    pub fn iterator_batch_size(mut self, size: usize) -> Self {
        self.config.iterator_batch_size = size;
        self
    }

    /// Sets the trigger lateness threshold in milliseconds.
    #[must_use]
    pub fn trigger_lateness_ms(mut self, ms: u64) -> Self {
        self.config.trigger_lateness_ms = ms;
        self
    }

    /// Sets the data directory for durable tables.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = Some(dir.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        self.config
    }
}
