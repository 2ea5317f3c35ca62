//! Structured logging setup for binaries embedding the consumer.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a fmt subscriber filtered by `RUST_LOG`, or `default_filter`
/// when the variable is unset or invalid.
///
/// Returns an error if a global subscriber is already set.
pub fn init_logging(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
