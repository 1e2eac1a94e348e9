//! Error handling for Wavescope
//!
//! Configuration errors are handler-scoped: they invalidate the handler
//! that produced them and never unwind the rest of the graph. Runtime
//! errors (overflow, deadline) unwind only the current tick.

use thiserror::Error;

/// Result type alias for Wavescope operations
pub type Result<T> = std::result::Result<T, WavescopeError>;

/// Main error type for Wavescope operations
#[derive(Error, Debug)]
pub enum WavescopeError {
    // Configuration errors
    #[error("Invalid parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Source handler not found: {name}")]
    SourceNotFound { name: String },

    #[error("Source handler '{name}' has wrong type: expected {expected}")]
    SourceTypeMismatch { name: String, expected: &'static str },

    #[error("Invalid frequency list: {reason}")]
    InvalidFreqList { reason: String },

    #[error("Invalid filter description: {reason}")]
    InvalidFilter { reason: String },

    #[error("Invalid transform description: {reason}")]
    InvalidTransform { reason: String },

    // Runtime errors
    #[error("Handler '{handler}' produced too many values")]
    TooManyValues { handler: String },

    #[error("Processing killed on timeout after {elapsed_ms:.2} ms")]
    DeadlineExceeded { elapsed_ms: f64 },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WavescopeError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            WavescopeError::InvalidParams { .. } => "INVALID_PARAMS",
            WavescopeError::SourceNotFound { .. } => "SOURCE_NOT_FOUND",
            WavescopeError::SourceTypeMismatch { .. } => "SOURCE_TYPE_MISMATCH",
            WavescopeError::InvalidFreqList { .. } => "INVALID_FREQ_LIST",
            WavescopeError::InvalidFilter { .. } => "INVALID_FILTER",
            WavescopeError::InvalidTransform { .. } => "INVALID_TRANSFORM",
            WavescopeError::TooManyValues { .. } => "TOO_MANY_VALUES",
            WavescopeError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            WavescopeError::Io(_) => "IO_ERROR",
            WavescopeError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Configuration errors invalidate a single handler and leave the
    /// rest of the graph operating.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            WavescopeError::InvalidParams { .. }
                | WavescopeError::SourceNotFound { .. }
                | WavescopeError::SourceTypeMismatch { .. }
                | WavescopeError::InvalidFreqList { .. }
                | WavescopeError::InvalidFilter { .. }
                | WavescopeError::InvalidTransform { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = WavescopeError::SourceNotFound {
            name: "fft".to_string(),
        };
        assert_eq!(err.error_code(), "SOURCE_NOT_FOUND");
    }

    #[test]
    fn test_configuration_scope() {
        let err = WavescopeError::InvalidFreqList {
            reason: "need >= 2 frequencies".to_string(),
        };
        assert!(err.is_configuration());

        let err = WavescopeError::DeadlineExceeded { elapsed_ms: 12.0 };
        assert!(!err.is_configuration());
    }
}
