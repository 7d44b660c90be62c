//! Tracing subscriber setup for applications embedding the client.
//!
//! The library itself only emits `tracing` events; binaries call
//! [`init_tracing`] once at startup to see them.

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "pagecraft_backend=info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Read `PAGECRAFT_LOG_FORMAT` (`json` or anything else for pretty).
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("PAGECRAFT_LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Install the global subscriber with an `EnvFilter`.
///
/// Defaults to [`DEFAULT_FILTER`] if `RUST_LOG` is not set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
}
