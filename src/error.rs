//! Pipeline error types

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures outside the answer vocabulary. Rejected answers are not
/// errors; they come back as `SubmitOutcome::Rejected`.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No session stored under this id
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The session changed between load and commit; nothing was written
    #[error("Session {0} was modified concurrently; reload and resubmit")]
    Conflict(String),

    /// Answer payload was not an object or array of answers
    #[error("Invalid answer payload: {0}")]
    InvalidPayload(String),

    /// A question provider failed outright
    #[error("Question provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    /// Session store failure
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
