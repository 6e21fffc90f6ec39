//! Executor for agents authored as LangGraph graphs.
//!
//! Re-execution targets the single node the checkpoint was taken at. The
//! node runs through a [`GraphRuntime`] supplied by the embedding
//! application. Without one the executor refuses to run instead of falling
//! back to generic behavior. With a runtime but no graph definition in the
//! checkpoint it returns the execution plan, labeled as not re-executed.

use super::{AgentExecutor, ExecutorError, Overrides, given};
use agentrace_core::CheckpointState;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Framework name served by this executor
pub const FRAMEWORK: &str = "langgraph";

/// Bridge to a live LangGraph runtime
#[async_trait]
pub trait GraphRuntime: Send + Sync {
    /// Run one node of the graph described by `graph_definition`
    async fn invoke_node(
        &self,
        graph_definition: &Value,
        node_name: &str,
        state: Value,
        config: Value,
    ) -> Result<Value, ExecutorError>;
}

/// Re-executes one LangGraph node from checkpointed state
#[derive(Clone, Default)]
pub struct LangGraphExecutor {
    runtime: Option<Arc<dyn GraphRuntime>>,
}

impl LangGraphExecutor {
    /// Executor with no runtime attached; every call is unsupported
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Executor backed by `runtime`
    #[must_use]
    pub fn with_runtime(runtime: Arc<dyn GraphRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }

    /// Whether a runtime is attached
    #[must_use]
    pub fn has_runtime(&self) -> bool {
        self.runtime.is_some()
    }
}

/// Node name is the part of the span name after the last `:`
fn node_name(span_name: &str) -> &str {
    span_name.rsplit(':').next().unwrap_or(span_name)
}

/// Input fields overlaid with the prior span's output
fn node_state(input: &Value, prior_output: &Value) -> Value {
    let mut merged = Map::new();
    match input {
        Value::Object(fields) => merged.extend(fields.clone()),
        Value::Null => {}
        other => {
            merged.insert("input".into(), other.clone());
        }
    }
    if let Value::Object(fields) = prior_output {
        merged.extend(fields.clone());
    }
    Value::Object(merged)
}

fn graph_config(config: &Value, overrides: Option<&Overrides>) -> Value {
    let mut graph_config = config
        .get("config")
        .and_then(|c| c.get("graph_config"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    if let Some(overrides) = overrides {
        for key in ["model", "temperature"] {
            if let Some(value) = overrides.get(key) {
                graph_config.insert(key.into(), value.clone());
            }
        }
    }
    Value::Object(graph_config)
}

#[async_trait]
impl AgentExecutor for LangGraphExecutor {
    fn name(&self) -> &str {
        FRAMEWORK
    }

    async fn execute(
        &self,
        input: &Value,
        state: CheckpointState<'_>,
        config: &Value,
        overrides: Option<&Overrides>,
    ) -> Result<Value, ExecutorError> {
        let runtime = self.runtime.as_ref().ok_or_else(|| {
            ExecutorError::unsupported(FRAMEWORK, "no LangGraph runtime is attached")
        })?;

        let node = node_name(state.span_name().unwrap_or_default());
        let lg_state = node_state(input, state.prior_output());
        let graph_config = graph_config(config, given(overrides));

        let definition = state.field("graph_definition");
        if definition.is_null() {
            return Ok(json!({
                "note": "LangGraph executor: node was not re-executed",
                "reexecuted": false,
                "node_name": node,
                "framework": FRAMEWORK,
                "state": lg_state,
                "config_applied": graph_config,
                "original_output": state.output(),
                "message": format!(
                    "Would re-execute LangGraph node '{node}'; \
                     the checkpoint carries no graph definition"
                ),
            }));
        }

        runtime.invoke_node(definition, node, lg_state, graph_config).await
    }
}
