//! Tracing and logging configuration for the server
//!
//! Development gets pretty, human readable output; production gets flattened JSON
//! events for log aggregation.

use tracing_subscriber::{
    EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
};

use crate::config::Environment;

/// Initialize tracing/logging based on the environment
///
/// # Development Mode
/// - Pretty-printed logs with file locations and line numbers
/// - Default level: DEBUG, store crates included
///
/// # Production Mode
/// - JSON-formatted structured logs, one object per event
/// - Default level: INFO
///
/// # Environment Variables
/// - `RUST_LOG`: Override the default filter (e.g., `RUST_LOG=sb_db=trace,tower_http=info`)
///
/// # Errors
/// Fails when a global subscriber is already installed.
pub fn init_tracing(env: Environment) -> Result<(), TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(env)));

    if env.is_development() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .pretty()
                    .with_filter(env_filter),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .flatten_event(true)
                    .with_target(true)
                    .with_filter(env_filter),
            )
            .try_init()?;
    }

    tracing::info!(environment = ?env, "Tracing initialized");
    Ok(())
}

/// Filter used when `RUST_LOG` is not set.
pub const fn default_filter(env: Environment) -> &'static str {
    match env {
        Environment::Development => "debug,tower_http=debug,sb_db=debug,sb_api=debug",
        Environment::Production => "info,tower_http=info,sb_db=info,sb_api=info",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_parse() {
        for env in [Environment::Development, Environment::Production] {
            assert!(EnvFilter::try_new(default_filter(env)).is_ok());
        }
    }
}
