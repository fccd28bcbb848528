//! Configuration: YAML schema and multi-source loading.

pub mod loader;
pub mod schema;

pub use loader::{load_config, resolve_db_path};
pub use schema::{TrackGraphConfig, TraversalSettings};
