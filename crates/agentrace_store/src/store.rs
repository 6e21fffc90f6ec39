//! The state store adapter trait.

use crate::error::StoreResult;
use agentrace_core::{
    AgentConfig, AgentId, AgentRecord, CheckpointId, CheckpointRecord, ReplayId, ReplayRecord,
    SpanId, SpanRecord, TraceId,
};
use async_trait::async_trait;

/// A checkpoint as it sits in storage: metadata plus the opaque state blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCheckpoint {
    /// Metadata
    pub record: CheckpointRecord,
    /// Canonical state bytes, exactly as hashed
    pub state: Vec<u8>,
}

/// Persistence for everything the replay engine reads and writes.
///
/// Each call is atomic on its own; there are no multi-call transactions.
/// Listing order is part of the contract: spans ascend by start time,
/// checkpoints ascend by timestamp, replays descend by creation time.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Insert or replace a span
    async fn put_span(&self, span: SpanRecord) -> StoreResult<()>;

    /// Insert or replace an agent
    async fn put_agent(&self, agent: AgentRecord) -> StoreResult<()>;

    /// Look up a span
    async fn get_span(&self, span_id: SpanId) -> StoreResult<Option<SpanRecord>>;

    /// All spans of a trace, ascending by start time
    async fn list_spans(&self, trace_id: TraceId) -> StoreResult<Vec<SpanRecord>>;

    /// Look up an agent
    async fn get_agent(&self, agent_id: AgentId) -> StoreResult<Option<AgentRecord>>;

    /// Look up an agent's resolved configuration
    async fn get_agent_config(&self, agent_id: AgentId) -> StoreResult<Option<AgentConfig>> {
        Ok(self.get_agent(agent_id).await?.map(|agent| agent.config))
    }

    /// Insert a checkpoint; returns `false` when the identifier already existed
    async fn insert_checkpoint(
        &self,
        record: CheckpointRecord,
        state: Vec<u8>,
    ) -> StoreResult<bool>;

    /// Look up a checkpoint by exact identifier
    async fn get_checkpoint(&self, id: &CheckpointId) -> StoreResult<Option<StoredCheckpoint>>;

    /// Checkpoint metadata of a trace, ascending by timestamp
    async fn list_checkpoints(&self, trace_id: TraceId) -> StoreResult<Vec<CheckpointRecord>>;

    /// Delete a checkpoint; returns the number of records removed
    async fn delete_checkpoint(&self, id: &CheckpointId) -> StoreResult<usize>;

    /// Persist a replay record
    async fn insert_replay(&self, record: ReplayRecord) -> StoreResult<()>;

    /// Look up a replay record
    async fn get_replay(&self, id: ReplayId) -> StoreResult<Option<ReplayRecord>>;

    /// Replay records of a trace, newest first
    async fn list_replays(&self, trace_id: TraceId) -> StoreResult<Vec<ReplayRecord>>;

    /// Bump `replay_count` and set `last_replayed` to now
    async fn increment_replay_stats(&self, id: &CheckpointId) -> StoreResult<()>;

    /// Remove a trace with all its spans, agents, checkpoints and replays
    async fn delete_trace(&self, trace_id: TraceId) -> StoreResult<usize>;
}

pub(crate) fn sort_spans(spans: &mut [SpanRecord]) {
    spans.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.span_id.cmp(&b.span_id))
    });
}

pub(crate) fn sort_checkpoints(records: &mut [CheckpointRecord]) {
    records.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.checkpoint_id.cmp(&b.checkpoint_id))
    });
}

pub(crate) fn sort_replays(records: &mut [ReplayRecord]) {
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.result.replay_id.cmp(&a.result.replay_id))
    });
}
