//! In-memory state store.

use crate::error::{StoreError, StoreResult};
use crate::store::{StateStore, StoredCheckpoint, sort_checkpoints, sort_replays, sort_spans};
use agentrace_core::{
    AgentId, AgentRecord, CheckpointId, CheckpointRecord, ReplayId, ReplayRecord, SpanId,
    SpanRecord, TraceId,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    spans: HashMap<SpanId, SpanRecord>,
    agents: HashMap<AgentId, AgentRecord>,
    checkpoints: HashMap<CheckpointId, StoredCheckpoint>,
    replays: HashMap<ReplayId, ReplayRecord>,
}

/// Store backed by hash maps behind a single async lock
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn put_span(&self, span: SpanRecord) -> StoreResult<()> {
        self.tables.write().await.spans.insert(span.span_id, span);
        Ok(())
    }

    async fn put_agent(&self, agent: AgentRecord) -> StoreResult<()> {
        self.tables.write().await.agents.insert(agent.agent_id, agent);
        Ok(())
    }

    async fn get_span(&self, span_id: SpanId) -> StoreResult<Option<SpanRecord>> {
        Ok(self.tables.read().await.spans.get(&span_id).cloned())
    }

    async fn list_spans(&self, trace_id: TraceId) -> StoreResult<Vec<SpanRecord>> {
        let mut spans: Vec<_> = self
            .tables
            .read()
            .await
            .spans
            .values()
            .filter(|s| s.trace_id == trace_id)
            .cloned()
            .collect();
        sort_spans(&mut spans);
        Ok(spans)
    }

    async fn get_agent(&self, agent_id: AgentId) -> StoreResult<Option<AgentRecord>> {
        Ok(self.tables.read().await.agents.get(&agent_id).cloned())
    }

    async fn insert_checkpoint(
        &self,
        record: CheckpointRecord,
        state: Vec<u8>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.checkpoints.contains_key(&record.checkpoint_id) {
            return Ok(false);
        }
        tables
            .checkpoints
            .insert(record.checkpoint_id.clone(), StoredCheckpoint { record, state });
        Ok(true)
    }

    async fn get_checkpoint(&self, id: &CheckpointId) -> StoreResult<Option<StoredCheckpoint>> {
        Ok(self.tables.read().await.checkpoints.get(id).cloned())
    }

    async fn list_checkpoints(&self, trace_id: TraceId) -> StoreResult<Vec<CheckpointRecord>> {
        let mut records: Vec<_> = self
            .tables
            .read()
            .await
            .checkpoints
            .values()
            .filter(|c| c.record.trace_id() == trace_id)
            .map(|c| c.record.clone())
            .collect();
        sort_checkpoints(&mut records);
        Ok(records)
    }

    async fn delete_checkpoint(&self, id: &CheckpointId) -> StoreResult<usize> {
        let removed = self.tables.write().await.checkpoints.remove(id);
        Ok(usize::from(removed.is_some()))
    }

    async fn insert_replay(&self, record: ReplayRecord) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .replays
            .insert(record.result.replay_id, record);
        Ok(())
    }

    async fn get_replay(&self, id: ReplayId) -> StoreResult<Option<ReplayRecord>> {
        Ok(self.tables.read().await.replays.get(&id).cloned())
    }

    async fn list_replays(&self, trace_id: TraceId) -> StoreResult<Vec<ReplayRecord>> {
        let mut records: Vec<_> = self
            .tables
            .read()
            .await
            .replays
            .values()
            .filter(|r| r.trace_id == trace_id)
            .cloned()
            .collect();
        sort_replays(&mut records);
        Ok(records)
    }

    async fn increment_replay_stats(&self, id: &CheckpointId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .checkpoints
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("checkpoint", id))?;
        stored.record.replay_count += 1;
        stored.record.last_replayed = Some(Utc::now());
        Ok(())
    }

    async fn delete_trace(&self, trace_id: TraceId) -> StoreResult<usize> {
        let mut tables = self.tables.write().await;
        let before = tables.spans.len()
            + tables.agents.len()
            + tables.checkpoints.len()
            + tables.replays.len();

        tables.spans.retain(|_, s| s.trace_id != trace_id);
        tables.agents.retain(|_, a| a.trace_id != trace_id);
        tables.checkpoints.retain(|_, c| c.record.trace_id() != trace_id);
        tables.replays.retain(|_, r| r.trace_id != trace_id);

        let after = tables.spans.len()
            + tables.agents.len()
            + tables.checkpoints.len()
            + tables.replays.len();
        Ok(before - after)
    }
}
