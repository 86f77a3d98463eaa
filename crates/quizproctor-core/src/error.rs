//! Sink error types.
//!
//! These error types represent failures when delivering telemetry or results
//! to the backend. Defined in `quizproctor-core` so the session host can
//! classify failures in its logs without string matching.

use thiserror::Error;

/// Errors that can occur when delivering a record to an external sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The backend answered with a non-success status.
    #[error("backend rejected record (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The API key was missing or refused.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SinkError {
    /// Returns `true` if resending the same record can never succeed.
    ///
    /// Deliveries are not retried either way; this only decides the log level.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            SinkError::Unauthorized(_)
                | SinkError::Serialization(_)
                | SinkError::Rejected {
                    status: 400..=499,
                    ..
                }
        )
    }
}
