//! Tracing subscriber set-up.

use tracing_subscriber::EnvFilter;

/// Error returned when a global subscriber is already installed.
pub type TelemetryError = Box<dyn std::error::Error + Send + Sync>;

/// Builds the filter from `RUST_LOG`, then `directive`, then `info`.
#[must_use]
pub fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError`] when a subscriber is already installed.
pub fn init(directive: &str, json: bool) -> Result<(), TelemetryError> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(directive))
        .with_target(true);
    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
}
