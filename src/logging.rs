//! Structured logging setup shared by both binaries.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the `tracing` subscriber.
///
/// Filter comes from `RUST_LOG` (default `coinrank=info`). Set
/// `COINRANK_LOG_JSON` for JSON lines instead of human-readable output.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coinrank=info"));

    let json_logging = std::env::var("COINRANK_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
