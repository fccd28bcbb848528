//! Multi-source config loading.
//!
//! Priority, lowest first: built-in defaults, a YAML file, environment
//! variables. The YAML file is the explicit `--config` path when given,
//! otherwise `<config_dir>/trackgraph/config.yaml` if it exists.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::config::schema::TrackGraphConfig;
use crate::error::{Result, TrackGraphError};

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DB_FILE_NAME: &str = "trackgraph.db";

/// Overrides `database.path`.
pub const ENV_DB: &str = "TRACKGRAPH_DB";
/// Overrides `traversal.default_max_depth`.
pub const ENV_MAX_DEPTH: &str = "TRACKGRAPH_MAX_DEPTH";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "trackgraph")
}

/// `<config_dir>/trackgraph/config.yaml` for the current platform.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// `<data_dir>/trackgraph/trackgraph.db` for the current platform.
pub fn default_db_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join(DB_FILE_NAME))
}

/// Load configuration from every source and validate the result.
pub fn load_config(explicit: Option<&Path>) -> Result<TrackGraphConfig> {
    load_config_from(explicit, default_config_path().as_deref(), |key| {
        std::env::var(key).ok()
    })
}

/// Inner implementation with the fallback path and environment injected
/// (for testing).
fn load_config_from(
    explicit: Option<&Path>,
    fallback: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<TrackGraphConfig> {
    let mut config = match (explicit, fallback) {
        (Some(path), _) => read_config_file(path)?,
        (None, Some(path)) if path.exists() => read_config_file(path)?,
        _ => TrackGraphConfig::default(),
    };
    apply_env_overrides(&mut config, env)?;
    config.validate()?;
    Ok(config)
}

/// Parse one YAML config file. A missing file is an error; an empty one
/// yields the defaults.
pub fn read_config_file(path: &Path) -> Result<TrackGraphConfig> {
    if !path.exists() {
        return Err(TrackGraphError::Config(format!(
            "No config file found at {}",
            path.display()
        )));
    }
    let contents = std::fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(TrackGraphConfig::default());
    }
    let config: TrackGraphConfig = serde_yaml::from_str(&contents).map_err(|e| {
        TrackGraphError::Config(format!("Failed to parse {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

fn apply_env_overrides(
    config: &mut TrackGraphConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(db) = env(ENV_DB).filter(|v| !v.trim().is_empty()) {
        config.database.path = Some(PathBuf::from(db));
    }
    if let Some(raw) = env(ENV_MAX_DEPTH) {
        config.traversal.default_max_depth = raw.trim().parse().map_err(|_| {
            TrackGraphError::Config(format!("{ENV_MAX_DEPTH} must be an integer, got '{raw}'"))
        })?;
    }
    Ok(())
}

/// The database path to open: the configured one, else the platform default.
pub fn resolve_db_path(config: &TrackGraphConfig) -> Result<PathBuf> {
    config
        .database
        .path
        .clone()
        .or_else(default_db_path)
        .ok_or_else(|| {
            TrackGraphError::Config("cannot determine a data directory for the database".into())
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::traversal::TraversalStrategy;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn no_sources_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("absent.yaml");
        let config = load_config_from(None, Some(missing.as_path()), no_env).unwrap();
        assert_eq!(config, TrackGraphConfig::default());
    }

    #[test]
    fn explicit_file_is_read() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "traversal:\n  default_max_depth: 3\n");
        let config = load_config_from(Some(path.as_path()), None, no_env).unwrap();
        assert_eq!(config.traversal.default_max_depth, 3);
    }

    #[test]
    fn fallback_file_is_read_when_present() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "traversal:\n  strategy: recursive_cte\n");
        let config = load_config_from(None, Some(path.as_path()), no_env).unwrap();
        assert_eq!(config.traversal.strategy, TraversalStrategy::RecursiveCte);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.yaml");
        let err = load_config_from(Some(missing.as_path()), None, no_env).unwrap_err();
        assert!(matches!(err, TrackGraphError::Config(_)), "{err}");
    }

    #[test]
    fn empty_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "\n");
        assert_eq!(read_config_file(&path).unwrap(), TrackGraphConfig::default());
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(&tmp, "traversal: [unclosed\n");
        let err = read_config_file(&path).unwrap_err();
        assert!(matches!(err, TrackGraphError::Config(_)), "{err}");
    }

    #[test]
    fn env_overrides_file_values() {
        let tmp = TempDir::new().unwrap();
        let path = write_config(
            &tmp,
            "database:\n  path: from-file.db\ntraversal:\n  default_max_depth: 3\n",
        );
        let env = env_from(&[(ENV_DB, "from-env.db"), (ENV_MAX_DEPTH, " 7 ")]);
        let config = load_config_from(Some(path.as_path()), None, env).unwrap();
        assert_eq!(config.database.path, Some(PathBuf::from("from-env.db")));
        assert_eq!(config.traversal.default_max_depth, 7);
    }

    #[test]
    fn non_numeric_depth_env_is_rejected() {
        let env = env_from(&[(ENV_MAX_DEPTH, "deep")]);
        let err = load_config_from(None, None, env).unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_DEPTH), "{err}");
    }

    #[test]
    fn negative_depth_env_fails_validation() {
        let env = env_from(&[(ENV_MAX_DEPTH, "-2")]);
        assert!(load_config_from(None, None, env).is_err());
    }

    #[test]
    fn configured_db_path_wins() {
        let mut config = TrackGraphConfig::default();
        config.database.path = Some(PathBuf::from(":memory:"));
        assert_eq!(resolve_db_path(&config).unwrap(), PathBuf::from(":memory:"));
    }

    #[test]
    fn default_db_path_ends_with_file_name() {
        if let Some(path) = default_db_path() {
            assert!(path.ends_with(DB_FILE_NAME));
        }
    }
}
