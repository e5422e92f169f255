//! Tracing subscriber installation.

use tracing_subscriber::{EnvFilter, fmt};

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of the compact human format.
    pub json: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
            json: false,
        }
    }
}

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter {directive:?}: {message}")]
    InvalidFilter {
        /// Directive that failed to parse.
        directive: String,
        /// Parser message.
        message: String,
    },
    /// A global subscriber was already installed.
    #[error("tracing subscriber already initialised")]
    AlreadyInitialised,
}

fn build_filter(settings: &TelemetrySettings) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.filter).map_err(|err| TelemetryError::InvalidFilter {
        directive: settings.filter.clone(),
        message: err.to_string(),
    })
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `settings.filter`.
///
/// # Errors
/// [`TelemetryError::InvalidFilter`] for an unparsable directive and
/// [`TelemetryError::AlreadyInitialised`] when called twice.
pub fn init_tracing(settings: &TelemetrySettings) -> Result<(), TelemetryError> {
    let filter = build_filter(settings)?;
    let builder = fmt().with_env_filter(filter);
    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|_| TelemetryError::AlreadyInitialised)
}
