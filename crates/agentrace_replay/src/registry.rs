//! Executor registry: framework name to executor.
//!
//! The registry is an ordinary value built at startup and handed to the
//! replay engine. Unknown frameworks resolve to the generic executor.

use crate::executor::{AgentExecutor, GenericExecutor, LANGGRAPH, LangGraphExecutor, MockExecutor};
use indexmap::IndexMap;
use std::sync::Arc;

/// Framework key of the fallback executor
pub const GENERIC: &str = "generic";
/// Framework key of the dry-run executor
pub const MOCK: &str = "mock";

/// Maps framework identifiers to executors
#[derive(Clone)]
pub struct ExecutorRegistry {
    executors: IndexMap<String, Arc<dyn AgentExecutor>>,
    fallback: Arc<dyn AgentExecutor>,
}

impl ExecutorRegistry {
    /// Registry holding only the generic executor
    #[must_use]
    pub fn new() -> Self {
        let fallback: Arc<dyn AgentExecutor> = Arc::new(GenericExecutor);
        let mut executors = IndexMap::new();
        executors.insert(GENERIC.to_string(), Arc::clone(&fallback));
        Self { executors, fallback }
    }

    /// Registry with the built-in generic, mock and langgraph executors
    ///
    /// The langgraph entry has no runtime attached; register a
    /// runtime-backed [`LangGraphExecutor`] to enable real re-execution.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_executor(MOCK, Arc::new(MockExecutor));
        registry.register_executor(LANGGRAPH, Arc::new(LangGraphExecutor::new()));
        registry
    }

    /// Bind `framework` to `executor`, replacing any previous binding
    pub fn register_executor(
        &mut self,
        framework: impl Into<String>,
        executor: Arc<dyn AgentExecutor>,
    ) {
        let framework = framework.into();
        if framework == GENERIC {
            self.fallback = Arc::clone(&executor);
        }
        self.executors.insert(framework, executor);
    }

    /// Executor for `framework`, or the generic executor when unregistered
    #[must_use]
    pub fn get_executor(&self, framework: &str) -> Arc<dyn AgentExecutor> {
        self.executors
            .get(framework)
            .map_or_else(|| Arc::clone(&self.fallback), Arc::clone)
    }

    /// Whether `framework` has its own binding
    #[must_use]
    pub fn contains(&self, framework: &str) -> bool {
        self.executors.contains_key(framework)
    }

    /// Registered framework names, in registration order
    #[must_use]
    pub fn frameworks(&self) -> Vec<&str> {
        self.executors.keys().map(String::as_str).collect()
    }
}

impl Default for ExecutorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{ExecutorError, Overrides};
    use agentrace_core::CheckpointState;
    use async_trait::async_trait;
    use serde_json::{Value, json};

    struct Fixed;

    #[async_trait]
    impl AgentExecutor for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn execute(
            &self,
            _input: &Value,
            _state: CheckpointState<'_>,
            _config: &Value,
            _overrides: Option<&Overrides>,
        ) -> Result<Value, ExecutorError> {
            Ok(json!("fixed"))
        }
    }

    #[test]
    fn test_defaults() {
        let registry = ExecutorRegistry::with_defaults();
        assert_eq!(registry.frameworks(), ["generic", "mock", "langgraph"]);
        assert_eq!(registry.get_executor("mock").name(), "mock");
        assert_eq!(registry.get_executor("langgraph").name(), "langgraph");
    }

    #[test]
    fn test_unknown_framework_falls_back_to_generic() {
        let registry = ExecutorRegistry::with_defaults();
        assert!(!registry.contains("nonexistent-framework"));
        assert_eq!(registry.get_executor("nonexistent-framework").name(), "generic");
    }

    #[tokio::test]
    async fn test_register_and_replace() {
        let mut registry = ExecutorRegistry::new();
        registry.register_executor("crewai", Arc::new(Fixed));
        assert!(registry.contains("crewai"));

        let state = json!({});
        let out = registry
            .get_executor("crewai")
            .execute(&json!({}), CheckpointState(&state), &json!({}), None)
            .await
            .unwrap();
        assert_eq!(out, json!("fixed"));

        registry.register_executor("crewai", Arc::new(MockExecutor));
        assert_eq!(registry.get_executor("crewai").name(), "mock");
        assert_eq!(registry.frameworks(), ["generic", "crewai"]);
    }

    #[test]
    fn test_replacing_generic_changes_fallback() {
        let mut registry = ExecutorRegistry::new();
        registry.register_executor(GENERIC, Arc::new(Fixed));
        assert_eq!(registry.get_executor("unheard-of").name(), "fixed");
    }
}
