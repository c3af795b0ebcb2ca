//! Structured logging with `tracing`.
//!
//! - [`LogLevel`] and [`LogFormat`] for settings
//! - [`init_subscriber`] for installing the global stderr subscriber
//! - [`test_utils`] for capturing events in tests

pub mod test_utils;
pub mod types;

pub use test_utils::{CapturedLogs, capture_logs};
pub use types::{LogFormat, LogLevel};

/// Initialize the global tracing subscriber on stderr.
///
/// Call once at application startup. Subsequent calls are no-ops.
/// `RUST_LOG`, when set and valid, takes precedence over `level`.
pub fn init_subscriber(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    // set_global_default is a no-op if already set
    let _ = match format {
        LogFormat::Pretty => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
