//! Deterministic executor for dry runs.
//!
//! Output depends only on its arguments; nothing external is called.

use super::{AgentExecutor, ExecutorError, Overrides, given};
use agentrace_core::CheckpointState;
use async_trait::async_trait;
use serde_json::{Map, Value, json};

/// Synthesizes an output shaped by the span kind
#[derive(Debug, Clone, Copy, Default)]
pub struct MockExecutor;

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

#[async_trait]
impl AgentExecutor for MockExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(
        &self,
        input: &Value,
        state: CheckpointState<'_>,
        config: &Value,
        overrides: Option<&Overrides>,
    ) -> Result<Value, ExecutorError> {
        let agent = config.get("name").and_then(Value::as_str).unwrap_or("unknown");
        let span_kind = state.span_kind().unwrap_or("unknown");
        let overrides = given(overrides);

        let mut response = Map::new();
        response.insert("mock".into(), json!(true));
        response.insert("agent".into(), json!(agent));
        response.insert("span_kind".into(), json!(span_kind));
        response.insert("input_echo".into(), input.clone());
        response.insert(
            "message".into(),
            json!(format!("Mock execution of {agent} ({span_kind})")),
        );
        if let Some(overrides) = overrides {
            response.insert("overrides_applied".into(), Value::Object(overrides.clone()));
        }

        match span_kind {
            "llm_call" => {
                let prompt = non_null(input.get("query"))
                    .or_else(|| non_null(input.get("prompt")))
                    .map_or_else(|| "unknown".to_string(), text);
                let model = overrides
                    .and_then(|o| non_null(o.get("model")))
                    .or_else(|| non_null(config.get("model")))
                    .cloned()
                    .unwrap_or_else(|| json!("mock-model"));
                response.insert("content".into(), json!(format!("Mock LLM response to: {prompt}")));
                response.insert("model".into(), model);
                response.insert("tokens".into(), json!({"input": 10, "output": 20}));
            }
            "tool_call" => {
                response.insert(
                    "tool_result".into(),
                    json!(format!("Mock tool result for: {input}")),
                );
                response.insert("success".into(), json!(true));
            }
            "handoff" => {
                let target = state
                    .agent_config()
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("next-agent");
                response.insert("handoff_to".into(), json!(target));
                response.insert("context".into(), input.clone());
            }
            other => {
                response.insert("output".into(), json!(format!("Mock output for {other}")));
            }
        }

        Ok(Value::Object(response))
    }
}
