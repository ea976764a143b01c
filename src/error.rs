//! Crate-level error types

use thiserror::Error;

/// Errors raised by the stress-testing engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// A caller-supplied argument is outside its valid domain
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Model configuration failed validation before simulation
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A non-finite number reached the receipt boundary
    #[error("non-finite value in receipt field `{field}`")]
    NonFiniteValue { field: String },

    /// Receipt body could not be converted to a JSON value
    #[error("receipt serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
