//! Worker configuration.
//!
//! Loaded from TOML, with an environment override for the engine module:
//!
//! ```toml
//! inbox_capacity = 8
//! thread_name = "stepglb-worker"
//! module = { manifest = "engine.toml" }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an engine manifest to load instead of the
/// configured module.
pub const MODULE_ENV: &str = "STEPGLB_MODULE";

/// Where the worker's engine module comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleSource {
    /// The engine compiled into this binary, with default settings.
    #[default]
    Builtin,
    /// An engine manifest file on disk.
    Manifest(PathBuf),
}

/// Worker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Engine module to load at startup.
    pub module: ModuleSource,
    /// Requests that may queue before `post` waits.
    pub inbox_capacity: usize,
    /// OS thread name of the worker.
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            module: ModuleSource::Builtin,
            inbox_capacity: 16,
            thread_name: "stepglb-worker".to_string(),
        }
    }
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config is not valid TOML for [`WorkerConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A setting is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl WorkerConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a TOML config.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `STEPGLB_MODULE` if it is set.
    pub fn with_env_overrides(self) -> Self {
        self.with_module_override(std::env::var(MODULE_ENV).ok())
    }

    /// Replace the module with a manifest path when `value` is non-empty.
    pub fn with_module_override(mut self, value: Option<String>) -> Self {
        if let Some(path) = value.filter(|v| !v.trim().is_empty()) {
            tracing::debug!(%path, "engine module overridden from environment");
            self.module = ModuleSource::Manifest(PathBuf::from(path));
        }
        self
    }

    /// Check ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "inbox_capacity must be at least 1".into(),
            ));
        }
        if self.thread_name.is_empty() || self.thread_name.contains('\0') {
            return Err(ConfigError::Invalid(
                "thread_name must be non-empty and free of NUL bytes".into(),
            ));
        }
        Ok(())
    }
}
