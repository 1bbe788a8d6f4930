//! Logging setup for the acme-tools binary
//!
//! Logs go to stderr so that command output on stdout stays scriptable.
//! `RUST_LOG` takes precedence over the level picked from `--verbose`.

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Filter directive used when `RUST_LOG` is not set
pub fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Initialize the tracing subscriber
pub fn init_logging(verbose: bool, format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    let json_layer = (format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
    });

    let text_layer = (format == LogFormat::Text).then(|| {
        fmt::layer()
            .with_target(verbose)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}
