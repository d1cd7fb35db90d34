// packages/engine/src/utils/errors.rs
//! Engine error types

use crate::interception::model::ExchangeResult;
use thiserror::Error;

/// Errors raised outside the exchange path
///
/// Exchanges themselves report through [`ExchangeResult`]; this type covers
/// registry bookkeeping, invocation and configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Type already declared: {0}")]
    DuplicateType(String),

    #[error("Type registry full: {0} types declared")]
    RegistryFull(usize),

    #[error("Operation already registered: {0}")]
    DuplicateOperation(String),

    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    #[error("Type is sealed: {0}")]
    Sealed(String),

    #[error("Exchange rejected: {0}")]
    ExchangeRejected(ExchangeResult),

    #[error("Interposer already installed")]
    AlreadyInstalled,

    #[error("Interposer not installed")]
    NotInstalled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Observability error: {0}")]
    ObservabilityError(String),
}

impl From<::config::ConfigError> for EngineError {
    fn from(err: ::config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}

/// Engine result alias
pub type Result<T> = std::result::Result<T, EngineError>;
