//! Error types for the PawBuddy search assistant
//!
//! The two mandatory pipeline stages (extraction, retrieval) surface their
//! failures as degraded-mode conditions; optional enrichment (profile
//! seeding, profile writes) is logged and swallowed.

use thiserror::Error;

/// Main error type for the assistant pipeline
#[derive(Error, Debug)]
pub enum AssistantError {
    /// Text-understanding service down or returned an unparsable structure.
    /// Callers degrade to keyword-only extraction and continue the turn.
    #[error("Intent extraction unavailable: {0}")]
    ExtractionUnavailable(String),

    /// Vector-similarity service down. Callers return an empty result set
    /// with an explicit retrieval-failed marker, never an empty success.
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// A merge conflict the resolver's policy does not cover. Internal
    /// defect: logged and self-healed, never surfaced to the caller.
    #[error("Unresolved merge conflict: {0}")]
    InvalidMergeConflict(String),

    /// Best-effort profile persistence failed; the session continues.
    #[error("Profile write failed: {0}")]
    ProfileWriteFailure(String),

    /// Session store errors
    #[error("Session error: {0}")]
    SessionError(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Profile store errors
    #[error("Profile store error: {0}")]
    ProfileStoreError(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Convert anyhow errors from adapter edges
impl From<anyhow::Error> for AssistantError {
    fn from(err: anyhow::Error) -> Self {
        AssistantError::SessionError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AssistantError::Timeout { duration_ms: 2500 };
        assert!(err.to_string().contains("2500"));
    }

    #[test]
    fn test_extraction_unavailable_display() {
        let err = AssistantError::ExtractionUnavailable("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
        assert!(err.to_string().contains("extraction"));
    }

    #[test]
    fn test_retrieval_unavailable_display() {
        let err = AssistantError::RetrievalUnavailable("HTTP 503".to_string());
        assert!(err.to_string().contains("HTTP 503"));
    }
}
