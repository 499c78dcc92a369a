//! Error types shared across the twin services
//!
//! Errors are classified by recoverability:
//! - Retryable: store connectivity, network failures
//! - NonRetryable: configuration errors, malformed payloads

use thiserror::Error;

use crate::db::DbError;

/// Error type for the control loop, pollers, and dispatchers
#[derive(Debug, Error)]
pub enum TwinError {
    // Retryable errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    // Non-retryable errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to parse payload: {0}")]
    Parse(String),

    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),
}

impl TwinError {
    /// Returns true if this error is worth retrying after a delay
    pub fn is_retryable(&self) -> bool {
        matches!(self, TwinError::Network(_) | TwinError::Db(_))
    }
}
