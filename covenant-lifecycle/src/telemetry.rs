//! Tracing Subscriber Initialization
//!
//! Installs a `tracing-subscriber` registry with an env filter and either a
//! human-readable or JSON formatter.

use covenant_core::ConfigError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter directives, e.g. "covenant_lifecycle=debug,info".
    pub filter: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "covenant_lifecycle=info,covenant_notify=info,warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl TelemetryConfig {
    /// Environment variables:
    /// - `COVENANT_LOG`: Filter directives (default: covenant_lifecycle=info,covenant_notify=info,warn)
    /// - `COVENANT_LOG_FORMAT`: "json" or "text" (default: text)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            filter: std::env::var("COVENANT_LOG").unwrap_or(defaults.filter),
            format: match std::env::var("COVENANT_LOG_FORMAT").as_deref() {
                Ok("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at startup. Fails if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), ConfigError> {
    let env_filter = EnvFilter::try_new(&config.filter).map_err(|e| ConfigError::InvalidValue {
        field: "COVENANT_LOG".to_string(),
        value: config.filter.clone(),
        reason: e.to_string(),
    })?;

    let json = config.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(env_filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .try_init()
        .map_err(|e| ConfigError::InvalidValue {
            field: "tracing_subscriber".to_string(),
            value: config.filter.clone(),
            reason: format!("Failed to init subscriber: {}", e),
        })?;

    tracing::info!(filter = %config.filter, format = ?config.format, "Telemetry initialized");
    Ok(())
}
