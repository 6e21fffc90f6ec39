//! Store errors.

use thiserror::Error;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record not found
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind (`checkpoint`, `span`, ...)
        kind: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The backing database failed
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored checkpoint is unreadable or incomplete
    #[error("Checkpoint {id} is corrupted: {reason}")]
    Corrupted {
        /// Checkpoint identifier
        id: String,
        /// What failed
        reason: String,
    },

    /// A record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a not-found error
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Create a corruption error for a stored checkpoint
    pub fn corrupted(id: impl ToString, reason: impl ToString) -> Self {
        Self::Corrupted {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<redb::Error> for StoreError {
    fn from(err: redb::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

macro_rules! from_redb {
    ($($err:ty),* $(,)?) => {
        $(
            impl From<$err> for StoreError {
                fn from(err: $err) -> Self {
                    Self::from(redb::Error::from(err))
                }
            }
        )*
    };
}

from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Backend(format!("storage task failed: {err}"))
    }
}
