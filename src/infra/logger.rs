// src/infra/logger.rs — Structured logging with tracing

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. `FITDASH_LOG` wins over `RUST_LOG`, which
/// wins over `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env("FITDASH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(level));

    // try_init: tests and embedders may have installed a subscriber already
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}
