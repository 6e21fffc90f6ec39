//! Replay engine: re-run agent logic from a checkpoint and record the outcome.
//!
//! A replay moves through `Loaded -> Executing -> {Succeeded | Failed |
//! TimedOut} -> Diffed -> Persisted`. Lookup failures stop it before
//! execution. Execution failures and timeouts are outcomes, not errors: they
//! are recorded with `success = false` and diffed against a null output.

use crate::checkpoint::CheckpointManager;
use crate::diff::compute_diff;
use crate::error::{EngineResult, ReplayError};
use crate::registry::{ExecutorRegistry, GENERIC, MOCK};
use agentrace_core::{
    CheckpointId, ReplayConfig, ReplayId, ReplayRecord, ReplayResult, ReplaySummary, TraceId,
};
use agentrace_store::StateStore;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tracing::{debug, info, instrument, warn};

/// Runs replays and persists their records
#[derive(Clone)]
pub struct ReplayEngine {
    checkpoints: CheckpointManager,
    registry: Arc<ExecutorRegistry>,
}

impl ReplayEngine {
    /// Create an engine over a checkpoint manager and an executor registry
    #[must_use]
    pub fn new(checkpoints: CheckpointManager, registry: Arc<ExecutorRegistry>) -> Self {
        Self {
            checkpoints,
            registry,
        }
    }

    /// The checkpoint manager
    #[must_use]
    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    /// The executor registry
    #[must_use]
    pub fn registry(&self) -> &ExecutorRegistry {
        &self.registry
    }

    fn store(&self) -> &Arc<dyn StateStore> {
        self.checkpoints.store()
    }

    /// Replay from a checkpoint
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::CheckpointNotFound`], [`ReplayError::CheckpointCorrupted`]
    /// or [`ReplayError::SpanNotFound`] before execution, and
    /// [`ReplayError::PersistenceFailure`] if the replay record cannot be written.
    /// Executor failures and timeouts are reported inside the result.
    #[instrument(skip_all, fields(checkpoint_id = %checkpoint_id, dry_run = config.dry_run))]
    pub async fn replay(
        &self,
        checkpoint_id: &CheckpointId,
        config: ReplayConfig,
    ) -> EngineResult<ReplayResult> {
        let checkpoint = self.checkpoints.load(checkpoint_id).await?;
        let span_id = checkpoint.span_id();
        let span = self
            .store()
            .get_span(span_id)
            .await?
            .ok_or(ReplayError::SpanNotFound(span_id))?;
        debug!("checkpoint loaded");

        let state = checkpoint.view();
        let input = config
            .modified_input
            .clone()
            .unwrap_or_else(|| state.input().clone());
        let framework = if config.dry_run {
            MOCK
        } else {
            state.framework().unwrap_or(GENERIC)
        };
        let executor = self.registry.get_executor(framework);
        debug!(framework, executor = executor.name(), "executing");

        let started = Instant::now();
        let outcome = timeout(
            Duration::from_secs(config.timeout_seconds),
            executor.execute(&input, state, state.agent_config(), config.agent_overrides.as_ref()),
        )
        .await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let outcome = match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(ReplayError::from(err)),
            Err(_) => Err(ReplayError::ExecutorTimeout {
                seconds: config.timeout_seconds,
            }),
        };
        let (success, replay_output, error) = match outcome {
            Ok(output) => (true, output, None),
            Err(err) => {
                warn!(error = %err, "replay execution failed");
                (false, Value::Null, Some(err.to_string()))
            }
        };

        let diff = compute_diff(&span.output, &replay_output);
        let (tokens_used, cost_usd) = usage(&replay_output);

        let result = ReplayResult {
            replay_id: ReplayId::new(),
            checkpoint_id: checkpoint_id.clone(),
            original_output: span.output,
            replay_output,
            diff,
            success,
            error,
            duration_ms,
            tokens_used,
            cost_usd,
        };

        let record = ReplayRecord {
            result: result.clone(),
            trace_id: checkpoint.trace_id(),
            config,
            created_at: Utc::now(),
        };
        self.store().insert_replay(record).await?;

        if let Err(err) = self.store().increment_replay_stats(checkpoint_id).await {
            warn!(error = %err, "failed to update checkpoint replay stats");
        }

        info!(
            replay_id = %result.replay_id,
            success,
            duration_ms,
            changes = result.diff.change_count(),
            "replay recorded"
        );
        Ok(result)
    }

    /// Fetch a recorded replay
    ///
    /// # Errors
    ///
    /// Returns error if the store fails
    pub async fn get_replay(&self, replay_id: ReplayId) -> EngineResult<Option<ReplayRecord>> {
        Ok(self.store().get_replay(replay_id).await?)
    }

    /// Replays of a trace, newest first
    ///
    /// # Errors
    ///
    /// Returns error if the store fails
    pub async fn list_replays_for_trace(
        &self,
        trace_id: TraceId,
    ) -> EngineResult<Vec<ReplaySummary>> {
        let records = self.store().list_replays(trace_id).await?;
        Ok(records.iter().map(ReplayRecord::summary).collect())
    }
}

/// Token count and cost reported by an executor output
fn usage(output: &Value) -> (Option<u64>, Option<f64>) {
    let tokens = output.get("tokens_used").and_then(Value::as_u64).or_else(|| {
        output.get("tokens").and_then(Value::as_object).and_then(|t| {
            let count = |key: &str| t.get(key).and_then(Value::as_u64).unwrap_or(0);
            count("input").checked_add(count("output"))
        })
    });
    let cost = output.get("cost_usd").and_then(Value::as_f64);
    (tokens, cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{AgentExecutor, ExecutorError, Overrides};
    use crate::testing::{FaultyStore, TraceFixture, span_at};
    use agentrace_core::{AgentConfig, Checkpoint, CheckpointState, SpanId, SpanRecord};
    use agentrace_store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;

    struct Never;

    #[async_trait]
    impl AgentExecutor for Never {
        fn name(&self) -> &str {
            "never"
        }

        async fn execute(
            &self,
            _input: &Value,
            _state: CheckpointState<'_>,
            _config: &Value,
            _overrides: Option<&Overrides>,
        ) -> Result<Value, ExecutorError> {
            std::future::pending().await
        }
    }

    struct Failing;

    #[async_trait]
    impl AgentExecutor for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn execute(
            &self,
            _input: &Value,
            _state: CheckpointState<'_>,
            _config: &Value,
            _overrides: Option<&Overrides>,
        ) -> Result<Value, ExecutorError> {
            Err(ExecutorError::failed("RateLimitError", "quota exceeded"))
        }
    }

    struct Costly;

    #[async_trait]
    impl AgentExecutor for Costly {
        fn name(&self) -> &str {
            "costly"
        }

        async fn execute(
            &self,
            _input: &Value,
            _state: CheckpointState<'_>,
            _config: &Value,
            _overrides: Option<&Overrides>,
        ) -> Result<Value, ExecutorError> {
            Ok(json!({"r": "y", "tokens": {"input": 7, "output": 5}, "cost_usd": 0.25}))
        }
    }

    /// Store holding one span with `{"input":{"q":"x"},"output":{"r":"y"}}` and its checkpoint
    async fn scenario(store: Arc<dyn StateStore>, framework: Option<&str>) -> CheckpointId {
        let trace = TraceId::new();
        let span = SpanRecord {
            input: json!({"q": "x"}),
            output: json!({"r": "y"}),
            ..span_at(trace, None, "llm_call", "answer", 0)
        };
        store.put_span(span.clone()).await.unwrap();

        let mut state = json!({"input": {"q": "x"}, "output": {"r": "y"}, "span_kind": "llm_call"});
        if let Some(framework) = framework {
            state["agent_config"] = AgentConfig::named("agent")
                .with_framework(framework)
                .to_state_value();
        }
        let checkpoint = Checkpoint::create(trace, span.span_id, None, "scenario", state).unwrap();
        CheckpointManager::new(store).save(&checkpoint).await.unwrap()
    }

    fn engine(store: Arc<dyn StateStore>, registry: ExecutorRegistry) -> ReplayEngine {
        ReplayEngine::new(CheckpointManager::new(store), Arc::new(registry))
    }

    #[tokio::test]
    async fn test_dry_run_uses_mock() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let id = scenario(store.clone(), None).await;
        let engine = engine(store.clone(), ExecutorRegistry::with_defaults());

        let result = engine.replay(&id, ReplayConfig::default().dry_run()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.replay_output["mock"], json!(true));
        assert_eq!(result.original_output, json!({"r": "y"}));
        assert!(result.diff.has_changes);
        assert_eq!(result.tokens_used, Some(30));
    }

    #[tokio::test]
    async fn test_modified_input_through_generic() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let id = scenario(store.clone(), Some("not-registered")).await;
        let engine = engine(store, ExecutorRegistry::with_defaults());

        let config = ReplayConfig::default().with_modified_input(json!({"q": "z"}));
        let result = engine.replay(&id, config).await.unwrap();
        assert!(result.success);
        assert_eq!(result.replay_output["input_modified"], json!(true));
        assert_eq!(result.replay_output["input_changes"]["original"], json!({"q": "x"}));
    }

    #[tokio::test]
    async fn test_unmodified_generic_replay_has_no_changes() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let id = scenario(store.clone(), None).await;
        let engine = engine(store, ExecutorRegistry::with_defaults());

        let result = engine.replay(&id, ReplayConfig::default()).await.unwrap();
        assert!(result.success);
        assert!(!result.diff.has_changes);
        assert_eq!(result.diff.summary, "No changes detected");
    }

    #[tokio::test]
    async fn test_missing_checkpoint() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let engine = engine(store.clone(), ExecutorRegistry::with_defaults());
        let missing = Checkpoint::create(TraceId::new(), SpanId::new(), None, "n", json!({}))
            .unwrap()
            .id()
            .clone();

        let err = engine.replay(&missing, ReplayConfig::default()).await.unwrap_err();
        assert!(matches!(err, ReplayError::CheckpointNotFound(_)));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_missing_span() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let checkpoint =
            Checkpoint::create(TraceId::new(), SpanId::new(), None, "n", json!({})).unwrap();
        CheckpointManager::new(store.clone()).save(&checkpoint).await.unwrap();
        let engine = engine(store, ExecutorRegistry::with_defaults());

        let err = engine.replay(checkpoint.id(), ReplayConfig::default()).await.unwrap_err();
        assert!(matches!(err, ReplayError::SpanNotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_recorded() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let id = scenario(store.clone(), Some("slow")).await;
        let mut registry = ExecutorRegistry::with_defaults();
        registry.register_executor("slow", Arc::new(Never));
        let engine = engine(store.clone(), registry);

        let result = engine
            .replay(&id, ReplayConfig::default().with_timeout(2))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
        assert!(result.replay_output.is_null());
        assert!((2000..2100).contains(&result.duration_ms));
        assert_eq!(result.diff.type_changes["root"].new_type, "null");

        let stored = engine.get_replay(result.replay_id).await.unwrap().unwrap();
        assert!(!stored.result.success);
        assert_eq!(stored.config.timeout_seconds, 2);
    }

    #[tokio::test]
    async fn test_executor_failure_is_recorded() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let id = scenario(store.clone(), Some("flaky")).await;
        let mut registry = ExecutorRegistry::with_defaults();
        registry.register_executor("flaky", Arc::new(Failing));
        let engine = engine(store, registry);

        let result = engine.replay(&id, ReplayConfig::default()).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("RateLimitError: quota exceeded"));
        assert!(result.replay_output.is_null());
    }

    #[tokio::test]
    async fn test_langgraph_without_runtime_is_recorded_as_unsupported() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let id = scenario(store.clone(), Some("langgraph")).await;
        let engine = engine(store, ExecutorRegistry::with_defaults());

        let result = engine.replay(&id, ReplayConfig::default()).await.unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("ExecutorUnsupported"));
    }

    #[tokio::test]
    async fn test_usage_extracted() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let id = scenario(store.clone(), Some("costly")).await;
        let mut registry = ExecutorRegistry::new();
        registry.register_executor("costly", Arc::new(Costly));
        let engine = engine(store, registry);

        let result = engine.replay(&id, ReplayConfig::default()).await.unwrap();
        assert_eq!(result.tokens_used, Some(12));
        assert_eq!(result.cost_usd, Some(0.25));
        assert_eq!(result.diff.added, ["cost_usd", "tokens"]);
    }

    #[tokio::test]
    async fn test_stats_updated() {
        let fixture = TraceFixture::seeded().await;
        let store: Arc<dyn StateStore> = fixture.store.clone();
        let manager = CheckpointManager::new(store.clone());
        let ids = manager.auto_checkpoint_trace(fixture.trace_id).await.unwrap();
        let engine = ReplayEngine::new(manager, Arc::new(ExecutorRegistry::with_defaults()));

        engine.replay(&ids[0], ReplayConfig::default()).await.unwrap();
        engine.replay(&ids[0], ReplayConfig::default().dry_run()).await.unwrap();

        let summary = engine.checkpoints().summary(&ids[0]).await.unwrap();
        assert_eq!(summary.replay_count, 2);
        assert!(summary.last_replayed.is_some());
        assert_eq!(engine.list_replays_for_trace(fixture.trace_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_stats_failure_is_swallowed() {
        let store: Arc<dyn StateStore> = Arc::new(FaultyStore::new().fail_stats());
        let id = scenario(store.clone(), None).await;
        let engine = engine(store, ExecutorRegistry::with_defaults());

        let result = engine.replay(&id, ReplayConfig::default()).await.unwrap();
        assert!(engine.get_replay(result.replay_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_record_persistence_failure_is_fatal() {
        let store: Arc<dyn StateStore> = Arc::new(FaultyStore::new().fail_insert_replay());
        let id = scenario(store.clone(), None).await;
        let engine = engine(store, ExecutorRegistry::with_defaults());

        let err = engine.replay(&id, ReplayConfig::default()).await.unwrap_err();
        assert!(matches!(err, ReplayError::PersistenceFailure(_)));
    }

    #[tokio::test]
    async fn test_concurrent_replays_are_independent() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let id = scenario(store.clone(), None).await;
        let engine = engine(store, ExecutorRegistry::with_defaults());

        let runs = (0..4).map(|_| engine.replay(&id, ReplayConfig::default().dry_run()));
        let results = futures::future::join_all(runs).await;
        let mut ids: Vec<_> = results.into_iter().map(|r| r.unwrap().replay_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 4);

        let trace = id.trace_id();
        assert_eq!(engine.list_replays_for_trace(trace).await.unwrap().len(), 4);
    }

    #[test]
    fn test_usage_prefers_tokens_used() {
        assert_eq!(usage(&json!({"tokens_used": 42, "tokens": {"input": 1}})), (Some(42), None));
        assert_eq!(usage(&json!({"tokens": {"output": 3}})), (Some(3), None));
        assert_eq!(usage(&json!("plain")), (None, None));
        assert_eq!(usage(&Value::Null), (None, None));
    }

    #[test]
    fn test_usage_overflow_is_unreported() {
        let output = json!({"tokens": {"input": u64::MAX, "output": 1}, "cost_usd": 0.5});
        assert_eq!(usage(&output), (None, Some(0.5)));
        let output = json!({"tokens": {"input": u64::MAX, "output": 0}});
        assert_eq!(usage(&output), (Some(u64::MAX), None));
    }
}
