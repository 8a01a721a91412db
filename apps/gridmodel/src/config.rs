//! # Store Configuration
//!
//! Layered settings for the host process: defaults, then an optional TOML
//! file, then `GRIDMODEL_*` environment variables, then command-line flags.
//!
//! ```toml
//! log_path = "/var/lib/gridmodel/deltas.log"
//! sync_on_commit = true
//! iterator_batch = 500
//! ```

use crate::error::AppError;
use gridmodel_core::primitives::{DEFAULT_ITERATOR_BATCH, MAX_ITERATOR_BATCH};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding [`StoreConfig::log_path`].
pub const ENV_LOG_PATH: &str = "GRIDMODEL_LOG_PATH";

/// Environment variable overriding [`StoreConfig::sync_on_commit`].
pub const ENV_SYNC: &str = "GRIDMODEL_SYNC";

const DEFAULT_LOG_PATH: &str = "gridmodel.log";

fn default_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_PATH)
}

const fn default_sync_on_commit() -> bool {
    true
}

const fn default_iterator_batch() -> usize {
    DEFAULT_ITERATOR_BATCH
}

/// Settings for opening the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Delta log file.
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// Flush the log to disk after every committed delta.
    #[serde(default = "default_sync_on_commit")]
    pub sync_on_commit: bool,

    /// Page size used when draining cursors.
    #[serde(default = "default_iterator_batch")]
    pub iterator_batch: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            sync_on_commit: default_sync_on_commit(),
            iterator_batch: default_iterator_batch(),
        }
    }
}

impl StoreConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))?;
        config.iterator_batch = clamp_batch(config.iterator_batch);
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply `GRIDMODEL_*` variables from the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    #[must_use]
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup(ENV_LOG_PATH).filter(|p| !p.trim().is_empty()) {
            self.log_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_SYNC) {
            match parse_flag(&raw) {
                Some(sync) => self.sync_on_commit = sync,
                None => tracing::warn!(
                    variable = ENV_SYNC,
                    value = %raw,
                    "Ignoring unrecognised boolean"
                ),
            }
        }
        self
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn clamp_batch(batch: usize) -> usize {
    batch.clamp(1, MAX_ITERATOR_BATCH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" off "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn batch_is_clamped() {
        assert_eq!(clamp_batch(0), 1);
        assert_eq!(clamp_batch(MAX_ITERATOR_BATCH + 1), MAX_ITERATOR_BATCH);
    }
}
