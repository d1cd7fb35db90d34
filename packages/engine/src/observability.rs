// packages/engine/src/observability.rs
//! Logging setup
//!
//! The engine emits `tracing` events and `metrics` counters. Installing a
//! subscriber is left to the embedding process; `init_tracing` is the one
//! the bundled binary uses. No metrics recorder is installed here, so the
//! counters are no-ops until the host installs one.

use crate::utils::config::LoggingConfig;
use crate::utils::errors::{EngineError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };

    installed.map_err(|e| EngineError::ObservabilityError(e.to_string()))
}
