//! Fallback executor that never re-runs agent logic.

use super::{AgentExecutor, ExecutorError, Overrides, given};
use agentrace_core::CheckpointState;
use async_trait::async_trait;
use serde_json::{Map, Value, json};

const NOTE: &str = "Generic executor: returned original output without re-execution";
const INPUT_WARNING: &str =
    "Input was modified but agent was not re-executed. Output may not reflect changes.";
const OVERRIDES_WARNING: &str = "Overrides were specified but not applied (no re-execution).";

/// Returns the recorded output, annotated when changes were requested
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericExecutor;

#[async_trait]
impl AgentExecutor for GenericExecutor {
    fn name(&self) -> &str {
        "generic"
    }

    async fn execute(
        &self,
        input: &Value,
        state: CheckpointState<'_>,
        _config: &Value,
        overrides: Option<&Overrides>,
    ) -> Result<Value, ExecutorError> {
        let original_output = state.output();
        let original_input = state.input();
        let input_modified = input != original_input;
        let overrides = given(overrides);

        if !input_modified && overrides.is_none() {
            return Ok(original_output.clone());
        }

        let mut result = Map::new();
        result.insert("output".into(), original_output.clone());
        result.insert("note".into(), json!(NOTE));
        result.insert("input_modified".into(), json!(input_modified));
        result.insert("overrides_ignored".into(), json!(overrides.is_some()));

        let mut warnings = Vec::new();
        if input_modified {
            warnings.push(INPUT_WARNING);
            result.insert(
                "input_changes".into(),
                json!({"original": original_input, "modified": input}),
            );
        }
        if let Some(overrides) = overrides {
            warnings.push(OVERRIDES_WARNING);
            result.insert("ignored_overrides".into(), Value::Object(overrides.clone()));
        }
        result.insert("warning".into(), json!(warnings.join(" ")));

        Ok(Value::Object(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Value {
        json!({"input": {"q": "x"}, "output": {"r": "y"}})
    }

    #[tokio::test]
    async fn test_unmodified_returns_original() {
        let state = state();
        let out = GenericExecutor
            .execute(&json!({"q": "x"}), CheckpointState(&state), &json!({}), None)
            .await
            .unwrap();
        assert_eq!(out, json!({"r": "y"}));
    }

    #[tokio::test]
    async fn test_empty_overrides_count_as_none() {
        let state = state();
        let out = GenericExecutor
            .execute(
                &json!({"q": "x"}),
                CheckpointState(&state),
                &json!({}),
                Some(&Overrides::new()),
            )
            .await
            .unwrap();
        assert_eq!(out, json!({"r": "y"}));
    }

    #[tokio::test]
    async fn test_modified_input_is_annotated() {
        let state = state();
        let out = GenericExecutor
            .execute(&json!({"q": "z"}), CheckpointState(&state), &json!({}), None)
            .await
            .unwrap();

        assert_eq!(out["output"], json!({"r": "y"}));
        assert_eq!(out["input_modified"], json!(true));
        assert_eq!(out["overrides_ignored"], json!(false));
        assert_eq!(out["input_changes"]["original"], json!({"q": "x"}));
        assert_eq!(out["input_changes"]["modified"], json!({"q": "z"}));
        assert_eq!(out["warning"], json!(INPUT_WARNING));
        assert!(out.get("ignored_overrides").is_none());
    }

    #[tokio::test]
    async fn test_overrides_are_reported_as_ignored() {
        let state = state();
        let mut overrides = Overrides::new();
        overrides.insert("model".into(), json!("gpt-4o"));

        let out = GenericExecutor
            .execute(&json!({"q": "x"}), CheckpointState(&state), &json!({}), Some(&overrides))
            .await
            .unwrap();

        assert_eq!(out["input_modified"], json!(false));
        assert_eq!(out["overrides_ignored"], json!(true));
        assert_eq!(out["ignored_overrides"], json!({"model": "gpt-4o"}));
        assert_eq!(out["warning"], json!(OVERRIDES_WARNING));
        assert!(out.get("input_changes").is_none());
    }

    #[tokio::test]
    async fn test_both_warnings_joined() {
        let state = state();
        let mut overrides = Overrides::new();
        overrides.insert("temperature".into(), json!(0.2));

        let out = GenericExecutor
            .execute(&json!({"q": "z"}), CheckpointState(&state), &json!({}), Some(&overrides))
            .await
            .unwrap();
        assert_eq!(out["warning"], json!(format!("{INPUT_WARNING} {OVERRIDES_WARNING}")));
    }
}
