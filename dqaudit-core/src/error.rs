//! Error types for the assessment engine.
//!
//! Only conditions that must abort a run are represented here. Recoverable
//! rule problems (bad regex, unknown column, oversized fuzzy blocks) are
//! reported as [`crate::quality::EngineWarning`] values instead.

use thiserror::Error;

/// Main error type for dqaudit operations.
#[derive(Debug, Error)]
pub enum DqError {
    /// Input dataset or document could not be accepted
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An output consistency check failed; no result is produced
    #[error("Validation invariant violated: {message}")]
    ValidationInvariant { message: String },

    /// The run was cancelled between rules or fuzzy blocks
    #[error("Assessment cancelled: {stage}")]
    Cancelled { stage: String },

    /// I/O operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Convenience type alias for Results with DqError
pub type Result<T> = std::result::Result<T, DqError>;

impl DqError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a validation invariant error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::ValidationInvariant {
            message: message.into(),
        }
    }

    /// Creates a cancellation error for the given stage
    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Returns true if this error means the output was withheld because it
    /// would have been internally inconsistent.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::ValidationInvariant { .. })
    }
}
