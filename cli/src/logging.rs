//! # Logging
//!
//! Wires `tracing-subscriber` for the `lockwallet` binary. Diagnostics go to
//! stderr; stdout carries only the scenario transcript and JSON output, so
//! `lockwallet demo | jq` keeps working with logs on.
//!
//! Three target families matter:
//!
//! ```text
//! lockwallet               this binary
//! lockwallet_contracts     ledger commits, rejections, rollbacks
//! lockwallet::events       one line per committed ledger event
//! lockwallet_protocol      transfers and custody, quiet unless asked
//! ```

use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Compact single-line output for a terminal.
    #[default]
    Pretty,
    /// One JSON object per line, event fields flattened to the top level.
    Json,
}

/// Filter directives for a `-v` count. `RUST_LOG` still wins when set.
pub fn filter_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn,lockwallet=info,lockwallet_contracts=info,lockwallet::events=info",
        1 => "warn,lockwallet=debug,lockwallet_contracts=debug,lockwallet::events=info,lockwallet_protocol=info",
        _ => "info,lockwallet=trace,lockwallet_contracts=trace,lockwallet::events=trace,lockwallet_protocol=trace",
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(
    verbosity: u8,
    format: LogFormat,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_for(verbosity)));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(verbosity > 0),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()?,
    }

    tracing::debug!(?format, verbosity, "logging ready");
    Ok(())
}
