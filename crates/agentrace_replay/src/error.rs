//! Replay engine errors.

use crate::executor::ExecutorError;
use agentrace_core::{CheckpointId, CoreError, ReplayId, SpanId};
use agentrace_store::StoreError;
use thiserror::Error;

/// Engine result type
pub type EngineResult<T> = Result<T, ReplayError>;

/// Everything that can go wrong between a replay request and its record
#[derive(Debug, Error)]
pub enum ReplayError {
    /// No checkpoint has this identifier
    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// The checkpoint exists but its state failed integrity or decoding
    #[error("Checkpoint {id} is corrupted: {reason}")]
    CheckpointCorrupted {
        /// Checkpoint identifier
        id: CheckpointId,
        /// What failed
        reason: String,
    },

    /// The span a checkpoint refers to is gone
    #[error("Span not found: {0}")]
    SpanNotFound(SpanId),

    /// No replay record has this identifier
    #[error("Replay not found: {0}")]
    ReplayNotFound(String),

    /// The executor cannot run because its framework runtime is missing
    #[error("ExecutorUnsupported: {0}")]
    ExecutorUnsupported(String),

    /// The executor ran and failed
    #[error("{kind}: {message}")]
    ExecutorFailure {
        /// Failure category
        kind: String,
        /// Failure description
        message: String,
    },

    /// The executor did not finish before the deadline
    #[error("Replay timed out after {seconds} seconds")]
    ExecutorTimeout {
        /// Deadline that elapsed
        seconds: u64,
    },

    /// A read or write against the state store failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    /// The request itself is malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ReplayError {
    /// Whether this error means a looked-up record does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CheckpointNotFound(_) | Self::SpanNotFound(_) | Self::ReplayNotFound(_)
        )
    }

    /// Checkpoint lookup failure for `id`
    pub fn checkpoint_not_found(id: impl ToString) -> Self {
        Self::CheckpointNotFound(id.to_string())
    }

    /// Replay lookup failure for `id`
    #[must_use]
    pub fn replay_not_found(id: ReplayId) -> Self {
        Self::ReplayNotFound(id.to_string())
    }
}

impl From<ExecutorError> for ReplayError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::Unsupported { .. } => Self::ExecutorUnsupported(err.to_string()),
            ExecutorError::Failed { kind, message } => Self::ExecutorFailure { kind, message },
        }
    }
}

impl From<CoreError> for ReplayError {
    fn from(err: CoreError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
