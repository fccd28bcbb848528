//! Configuration data structures for trackgraph.
//!
//! Defines the YAML config format: database location, traversal defaults,
//! and the logging filter. Every field has a serde default, so an empty or
//! partial file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackGraphError};
use crate::graph::traversal::{TraversalStrategy, DEFAULT_MAX_DEPTH};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for trackgraph.
///
/// Loaded from a YAML file and then patched by environment variables; see
/// [`crate::config::loader::load_config`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackGraphConfig {
    /// Config format version (currently "1.0").
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub traversal: TraversalSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TrackGraphConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database: DatabaseConfig::default(),
            traversal: TraversalSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TrackGraphConfig {
    /// Reject settings no operation could honour.
    pub fn validate(&self) -> Result<()> {
        if self.traversal.default_max_depth < 0 {
            return Err(TrackGraphError::Config(format!(
                "traversal.default_max_depth must be >= 0, got {}",
                self.traversal.default_max_depth
            )));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(TrackGraphError::Config("logging.filter must not be empty".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Where the SQLite database lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file, or `:memory:`. Unset means the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Defaults applied to catalog queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalSettings {
    /// Depth used when a query does not specify one.
    #[serde(default = "default_max_depth")]
    pub default_max_depth: i64,

    #[serde(default)]
    pub strategy: TraversalStrategy,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            default_max_depth: default_max_depth(),
            strategy: TraversalStrategy::default(),
        }
    }
}

/// `tracing-subscriber` filter used when `RUST_LOG` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_version() -> String {
    "1.0".to_string()
}

fn default_max_depth() -> i64 {
    DEFAULT_MAX_DEPTH
}

fn default_log_filter() -> String {
    "trackgraph=info".to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
