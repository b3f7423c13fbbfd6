//! Tracing subscriber bootstrap.
//!
//! Logs go to stderr so that stdout carries only operator-facing output.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use prs_kernel::settings::{LogFormat, TelemetrySettings};

/// Build the filter: `RUST_LOG` if set, otherwise the configured level.
pub fn filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.log_level)
            .with_context(|| format!("invalid log level '{}'", settings.log_level)),
    }
}

/// Install the global subscriber. A subscriber that is already installed is
/// left in place.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = filter(settings)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(format = ?settings.log_format, "telemetry initialized");
    }
    Ok(())
}
