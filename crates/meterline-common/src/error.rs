//! Error types for the Meterline pipeline
//!
//! Provides a unified error type shared by the agent, router, and billing
//! crates.

use thiserror::Error;

/// Result type alias using MeterlineError
pub type Result<T> = std::result::Result<T, MeterlineError>;

/// Unified error type for Meterline operations
#[derive(Debug, Error)]
pub enum MeterlineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Datagram transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    // Envelope encode/decode errors
    #[error("Codec error: {0}")]
    Codec(#[from] crate::types::envelope::EnvelopeError),

    // Durable log errors (stream creation, publish, consume)
    #[error("Log error: {0}")]
    Log(String),

    // Columnar store errors
    #[error("Store error: {0}")]
    Store(String),

    // Pricing collaborator errors
    #[error("Pricing error: {0}")]
    Pricing(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for MeterlineError {
    fn from(err: serde_json::Error) -> Self {
        MeterlineError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for MeterlineError {
    fn from(err: std::io::Error) -> Self {
        MeterlineError::Transport(err.to_string())
    }
}

impl From<anyhow::Error> for MeterlineError {
    fn from(err: anyhow::Error) -> Self {
        MeterlineError::Internal(err.to_string())
    }
}
