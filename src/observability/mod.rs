//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "trackgraph=info";

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// `RUST_LOG` wins when set; otherwise `fallback_filter` (normally
/// `logging.filter` from the config) is used. Events go to stderr so JSON
/// written to stdout stays parseable. Call once at program startup;
/// subsequent calls are silently ignored.
pub fn init_logging(fallback_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback_filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}
