//! Request-facing operations over checkpoints and replays.
//!
//! Every method resolves missing records to a not-found [`ReplayError`] so
//! adapters can map results without inspecting options.

use crate::checkpoint::CheckpointManager;
use crate::config::EngineConfig;
use crate::engine::ReplayEngine;
use crate::error::{EngineResult, ReplayError};
use crate::registry::ExecutorRegistry;
use agentrace_core::{
    CheckpointId, CheckpointSummary, Diff, ReplayConfig, ReplayId, ReplayRecord, ReplayResult,
    ReplaySummary, SpanId, StateHash, TraceId,
};
use agentrace_store::StateStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A checkpoint summary with its verified state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDetail {
    /// Joined checkpoint metadata
    #[serde(flatten)]
    pub summary: CheckpointSummary,
    /// Fingerprint of the state
    pub state_hash: StateHash,
    /// Decoded checkpoint state
    pub state: Value,
}

/// Facade used by the HTTP server and the CLI
#[derive(Clone)]
pub struct ReplayService {
    engine: ReplayEngine,
    config: EngineConfig,
}

impl ReplayService {
    /// Build a service over `store` with the given executors and settings
    #[must_use]
    pub fn new(
        store: Arc<dyn StateStore>,
        registry: ExecutorRegistry,
        config: EngineConfig,
    ) -> Self {
        let checkpoints = CheckpointManager::new(store).with_hash_algorithm(config.hash_algorithm);
        Self {
            engine: ReplayEngine::new(checkpoints, Arc::new(registry)),
            config,
        }
    }

    /// Engine settings
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying engine
    #[must_use]
    pub fn engine(&self) -> &ReplayEngine {
        &self.engine
    }

    fn checkpoints(&self) -> &CheckpointManager {
        self.engine.checkpoints()
    }

    /// Auto-checkpoint a trace
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::InvalidRequest`] when `auto` is false; single
    /// checkpoints go through [`Self::create_checkpoint`]
    pub async fn create_checkpoints(
        &self,
        trace_id: TraceId,
        auto: bool,
    ) -> EngineResult<Vec<CheckpointId>> {
        if !auto {
            return Err(ReplayError::InvalidRequest(
                "Bulk checkpoint creation requires auto=true; \
                 pass a span_id to checkpoint a single span"
                    .into(),
            ));
        }
        self.checkpoints().auto_checkpoint_trace(trace_id).await
    }

    /// Checkpoint a single span
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::SpanNotFound`] if the span is unknown
    pub async fn create_checkpoint(
        &self,
        span_id: SpanId,
        name: Option<String>,
    ) -> EngineResult<CheckpointId> {
        self.checkpoints().create_for_span(span_id, name).await
    }

    /// Checkpoints of a trace, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the store fails
    pub async fn list_checkpoints(
        &self,
        trace_id: TraceId,
    ) -> EngineResult<Vec<CheckpointSummary>> {
        self.checkpoints().list_for_trace(trace_id).await
    }

    /// Checkpoint summary plus its state
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::CheckpointNotFound`] or
    /// [`ReplayError::CheckpointCorrupted`]
    pub async fn get_checkpoint(&self, id: &CheckpointId) -> EngineResult<CheckpointDetail> {
        let checkpoint = self.checkpoints().load(id).await?;
        let summary = self.checkpoints().summary(id).await?;
        Ok(CheckpointDetail {
            summary,
            state_hash: checkpoint.state_hash().clone(),
            state: checkpoint.state().clone(),
        })
    }

    /// Delete a checkpoint
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::CheckpointNotFound`] if nothing was removed
    pub async fn delete_checkpoint(&self, id: &CheckpointId) -> EngineResult<()> {
        if self.checkpoints().delete(id).await? {
            Ok(())
        } else {
            Err(ReplayError::checkpoint_not_found(id))
        }
    }

    /// Replay from a checkpoint
    ///
    /// # Errors
    ///
    /// See [`ReplayEngine::replay`]
    pub async fn execute_replay(
        &self,
        id: &CheckpointId,
        config: ReplayConfig,
    ) -> EngineResult<ReplayResult> {
        self.engine.replay(id, config).await
    }

    async fn replay_record(&self, replay_id: ReplayId) -> EngineResult<ReplayRecord> {
        self.engine
            .get_replay(replay_id)
            .await?
            .ok_or_else(|| ReplayError::replay_not_found(replay_id))
    }

    /// A recorded replay
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::ReplayNotFound`] if absent
    pub async fn get_replay(&self, replay_id: ReplayId) -> EngineResult<ReplayResult> {
        Ok(self.replay_record(replay_id).await?.result)
    }

    /// The diff of a recorded replay
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::ReplayNotFound`] if absent
    pub async fn get_replay_diff(&self, replay_id: ReplayId) -> EngineResult<Diff> {
        Ok(self.replay_record(replay_id).await?.result.diff)
    }

    /// Replays of a trace, newest first
    ///
    /// # Errors
    ///
    /// Returns error if the store fails
    pub async fn list_replays(&self, trace_id: TraceId) -> EngineResult<Vec<ReplaySummary>> {
        self.engine.list_replays_for_trace(trace_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TraceFixture;
    use agentrace_core::HashAlgorithm;
    use serde_json::json;

    async fn service() -> (ReplayService, TraceFixture) {
        let fixture = TraceFixture::seeded().await;
        let service = ReplayService::new(
            fixture.store.clone(),
            ExecutorRegistry::with_defaults(),
            EngineConfig::default(),
        );
        (service, fixture)
    }

    #[tokio::test]
    async fn test_manual_bulk_creation_rejected() {
        let (service, fixture) = service().await;
        let err = service.create_checkpoints(fixture.trace_id, false).await.unwrap_err();
        assert!(matches!(err, ReplayError::InvalidRequest(_)));
        assert!(service.list_checkpoints(fixture.trace_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkpoint_detail() {
        let (service, fixture) = service().await;
        let ids = service.create_checkpoints(fixture.trace_id, true).await.unwrap();

        let detail = service.get_checkpoint(&ids[0]).await.unwrap();
        assert_eq!(detail.summary.checkpoint_id, ids[0]);
        assert_eq!(detail.summary.span_name, "plan");
        assert_eq!(&detail.state_hash, ids[0].state_hash());
        assert_eq!(detail.state["input"], json!({"q": "x"}));

        let encoded = serde_json::to_value(&detail).unwrap();
        assert_eq!(encoded["agent_name"], json!("planner"));
        assert_eq!(encoded["state"]["span_kind"], json!("llm_call"));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (service, fixture) = service().await;
        let ids = service.create_checkpoints(fixture.trace_id, true).await.unwrap();

        service.delete_checkpoint(&ids[0]).await.unwrap();
        let err = service.delete_checkpoint(&ids[0]).await.unwrap_err();
        assert!(matches!(err, ReplayError::CheckpointNotFound(_)));
        assert!(service.get_checkpoint(&ids[0]).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_replay_lookup() {
        let (service, fixture) = service().await;
        let ids = service.create_checkpoints(fixture.trace_id, true).await.unwrap();

        let config = service.config().replay_config().dry_run();
        let result = service.execute_replay(&ids[2], config).await.unwrap();
        assert_eq!(result.replay_output["handoff_to"], json!("planner"));

        let fetched = service.get_replay(result.replay_id).await.unwrap();
        assert_eq!(fetched, result);
        let diff = service.get_replay_diff(result.replay_id).await.unwrap();
        assert_eq!(diff, result.diff);

        let listed = service.list_replays(fixture.trace_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].replay_id, result.replay_id);

        let missing = ReplayId::new();
        assert!(matches!(
            service.get_replay(missing).await.unwrap_err(),
            ReplayError::ReplayNotFound(_)
        ));
        assert!(service.get_replay_diff(missing).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_single_span_checkpoint() {
        let (service, fixture) = service().await;
        let id = service
            .create_checkpoint(fixture.spans[1].span_id, Some("before relay".into()))
            .await
            .unwrap();
        let listed = service.list_checkpoints(fixture.trace_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].checkpoint_id, id);
        assert_eq!(listed[0].name, "before relay");
    }

    #[tokio::test]
    async fn test_hash_algorithm_from_config() {
        let fixture = TraceFixture::seeded().await;
        let blake = ReplayService::new(
            fixture.store.clone(),
            ExecutorRegistry::new(),
            EngineConfig::default().with_hash_algorithm(HashAlgorithm::Blake3),
        );
        let sha = ReplayService::new(
            fixture.store.clone(),
            ExecutorRegistry::new(),
            EngineConfig::default(),
        );

        let a = blake.create_checkpoint(fixture.spans[0].span_id, None).await.unwrap();
        let b = sha.create_checkpoint(fixture.spans[0].span_id, None).await.unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
        assert_eq!(
            blake.get_checkpoint(&a).await.unwrap().state,
            sha.get_checkpoint(&b).await.unwrap().state
        );
    }
}
