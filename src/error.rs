// this_file: src/error.rs
//! Error types for the surfpool library

use thiserror::Error;

/// Main error type for surfpool operations
#[derive(Debug, Error)]
pub enum Error {
    /// The backend could not create a new drawable
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// Draining outstanding acquire/release events on a drawable failed
    #[error("Sync flush error: {0}")]
    SyncFlush(String),

    /// JSON parsing or validation error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO operation error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    /// Whether the failure means "no drawable this cycle" and the frame
    /// should simply be skipped by the caller.
    pub fn is_frame_skippable(&self) -> bool {
        matches!(self, Error::Allocation(_) | Error::SyncFlush(_))
    }
}

/// Result type alias for surfpool operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpu_failures_are_frame_skippable() {
        assert!(Error::Allocation("oom".into()).is_frame_skippable());
        assert!(Error::SyncFlush("fence".into()).is_frame_skippable());
        assert!(!Error::InvalidParameter("0x0".into()).is_frame_skippable());
    }

    #[test]
    fn messages_carry_context() {
        let err = Error::SyncFlush("event drain timed out".into());
        assert_eq!(err.to_string(), "Sync flush error: event drain timed out");
    }
}
