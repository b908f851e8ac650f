//! Tracing setup for the admission service.
//!
//! Filter precedence: an explicit `RUST_LOG` wins, then the configured
//! `APP_LOG_LEVEL`, then a per-environment default that keeps admission-pass
//! debug output local to development builds.

use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    InvalidFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::InvalidFilter { value, .. } => {
                write!(f, "log filter '{}' is not a valid tracing directive", value)
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::InvalidFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Baseline verbosity when neither `RUST_LOG` nor `APP_LOG_LEVEL` is set.
/// Admission passes log at debug, so development gets them while production
/// keeps the quieter info stream.
fn default_directive(environment: AppEnvironment) -> &'static str {
    match environment {
        AppEnvironment::Development => "info,warden=debug",
        AppEnvironment::Test => "warn",
        AppEnvironment::Production => "info",
    }
}

fn build_filter(
    environment: AppEnvironment,
    config: &TelemetryConfig,
) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let directive = config
        .log_level
        .as_deref()
        .unwrap_or_else(|| default_directive(environment));
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::InvalidFilter {
        value: directive.to_string(),
        source,
    })
}

pub fn init(environment: AppEnvironment, config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(environment, config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
