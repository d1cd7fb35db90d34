// packages/engine/src/utils/config.rs
//! Engine configuration
//!
//! Layered with the `config` crate, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. `swizzle.{yaml,toml,json}` in the working directory, or the file named by
//!    `SWIZZLE_CONFIG`
//! 3. `SWIZZLE__*` environment variables (e.g. `SWIZZLE__GUARD__ENABLED=false`)

use crate::utils::errors::Result;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub guard: GuardConfig,
    pub exchange: ExchangeConfig,
    pub logging: LoggingConfig,
}

/// One-shot guard settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Reject a second exchange of an already exchanged pair
    pub enabled: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Exchange engine policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Fail exchanges whose two bodies carry different signature encodings
    pub require_matching_signatures: bool,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file locations and environment
    pub fn load() -> Result<Self> {
        let builder = match std::env::var("SWIZZLE_CONFIG") {
            Ok(path) => Config::builder().add_source(File::with_name(&path)),
            Err(_) => Config::builder().add_source(File::with_name("swizzle").required(false)),
        };

        let config = builder
            .add_source(Environment::with_prefix("SWIZZLE").separator("__").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load configuration from an explicit file, without environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
