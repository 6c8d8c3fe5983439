//! Tracing subscriber setup for the binary.

use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

const LOG_ENV: &str = "PAYORCH_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs a stderr fmt subscriber. Safe to call more than once.
pub fn init_tracing() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let result = tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_ansi(false),
            )
            .with(env_filter())
            .try_init();

        if result.is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }
    });
}
