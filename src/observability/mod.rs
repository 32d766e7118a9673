//! # Observability Infrastructure
//!
//! Structured logging for the certsync core using the tracing ecosystem.
//! Filtering follows `RUST_LOG`; output format is plain or JSON depending
//! on `CERTSYNC_LOG_FORMAT`.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Safe to call more than once; subsequent calls are no-ops. Set
/// `CERTSYNC_LOG_FORMAT=json` for JSON output.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("CERTSYNC_LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if json { builder.json().try_init() } else { builder.try_init() };

    if result.is_ok() {
        tracing::info!(json_format = json, "Tracing initialized");
    }
}
