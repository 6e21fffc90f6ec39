//! Core error types for AGENTRACE.

use thiserror::Error;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Invalid ID format
    #[error("Invalid ID format: {reason}")]
    InvalidId {
        /// Why the identifier was rejected
        reason: String,
    },

    /// Invalid hash format
    #[error("Invalid hash format: {reason}")]
    InvalidHash {
        /// Why the hash was rejected
        reason: String,
    },

    /// State could not be encoded or decoded
    #[error("Encoding error: {message}")]
    Encoding {
        /// Underlying serializer message
        message: String,
    },

    /// Stored bytes do not hash to the recorded value
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Hash recorded in the identifier
        expected: String,
        /// Hash recomputed from the bytes
        actual: String,
    },
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::HashMismatch {
            expected: "aaaa".to_string(),
            actual: "bbbb".to_string(),
        };
        assert_eq!(err.to_string(), "Hash mismatch: expected aaaa, got bbbb");
    }

    #[test]
    fn test_from_serde_error() {
        let err = serde_json::from_slice::<serde_json::Value>(b"{not json").unwrap_err();
        let core: CoreError = err.into();
        assert!(matches!(core, CoreError::Encoding { .. }));
    }
}
