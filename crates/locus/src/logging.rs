//! Tracing subscriber setup for the `locus` binary.

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Filter used when `RUST_LOG` is not set.
#[must_use]
pub const fn default_directives(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info,locus=debug" }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// # Errors
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init_logging(format: LogFormat, verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directives(verbose))
            .context("Failed to parse default filter directives")?,
    };

    let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init(),
    }
    .context("Failed to install tracing subscriber")
}
