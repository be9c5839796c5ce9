//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays clean for the report. `RUST_LOG` takes
//! precedence over the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LogSettings};
use crate::error::{CliError, CliResult};

/// Filter from `RUST_LOG`, falling back to `level`.
pub fn build_filter(level: &str) -> CliResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| CliError::Config(format!("invalid log level '{level}': {e}")))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(settings: &LogSettings) -> CliResult<()> {
    let filter = build_filter(&settings.level)?;

    let result = match settings.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(level = %settings.level, format = ?settings.format, "Logging initialized");
    }
    Ok(())
}
