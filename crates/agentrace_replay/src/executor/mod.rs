//! Executors: the pluggable step that re-runs agent logic.
//!
//! An executor receives the effective input, the checkpoint state, the
//! agent configuration snapshot and optional overrides, and produces an
//! output value. The registry picks one per replay by framework name.

mod generic;
mod langgraph;
mod mock;

pub use generic::GenericExecutor;
pub use langgraph::{FRAMEWORK as LANGGRAPH, GraphRuntime, LangGraphExecutor};
pub use mock::MockExecutor;

use agentrace_core::CheckpointState;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Agent configuration overrides (model, temperature, ...)
pub type Overrides = Map<String, Value>;

/// Executor failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The framework runtime needed for re-execution is not available
    #[error("{framework} executor unavailable: {reason}")]
    Unsupported {
        /// Framework the executor serves
        framework: String,
        /// What is missing
        reason: String,
    },

    /// Agent logic ran and failed
    #[error("{kind}: {message}")]
    Failed {
        /// Failure category
        kind: String,
        /// Failure description
        message: String,
    },
}

impl ExecutorError {
    /// Create an unsupported-operation error
    pub fn unsupported(framework: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            framework: framework.into(),
            reason: reason.into(),
        }
    }

    /// Create an execution failure
    pub fn failed(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Re-executes agent logic from a checkpoint
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Executor name, for logs
    fn name(&self) -> &str;

    /// Produce an output for `input` given the checkpoint state
    async fn execute(
        &self,
        input: &Value,
        state: CheckpointState<'_>,
        config: &Value,
        overrides: Option<&Overrides>,
    ) -> Result<Value, ExecutorError>;
}

/// Overrides count as given only when non-empty
pub(crate) fn given(overrides: Option<&Overrides>) -> Option<&Overrides> {
    overrides.filter(|o| !o.is_empty())
}
