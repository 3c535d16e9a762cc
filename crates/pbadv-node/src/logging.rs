//! Tracing subscriber setup.
//!
//! Level conventions used across the workspace:
//! - ERROR: protocol violations by the peer
//! - WARN: recoverable or unexpected conditions (foreign frames, buffer
//!   exhaustion, giving up a transaction)
//! - INFO: link lifecycle
//! - DEBUG: per-frame decisions
//! - TRACE: raw frame bytes

use tracing_subscriber::EnvFilter;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Human-readable output. `RUST_LOG` overrides `default_level`.
pub fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .init();
}

/// JSON output, selected with `RUST_LOG_FORMAT=json`.
pub fn init_json(default_level: &str) {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_level))
        .init();
}

/// Safe to call from every test.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}
