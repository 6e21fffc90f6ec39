//! Shared fixtures for engine tests.

use agentrace_core::{
    AgentConfig, AgentId, AgentRecord, CheckpointId, CheckpointRecord, ReplayId, ReplayRecord,
    SpanId, SpanRecord, TraceId,
};
use agentrace_store::{MemoryStore, StateStore, StoreError, StoreResult, StoredCheckpoint};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};
use std::sync::Arc;

pub fn span_at(
    trace_id: TraceId,
    agent_id: Option<AgentId>,
    kind: &str,
    name: &str,
    secs: i64,
) -> SpanRecord {
    SpanRecord {
        span_id: SpanId::new(),
        trace_id,
        parent_span_id: None,
        agent_id,
        name: name.to_string(),
        kind: kind.into(),
        start_time: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() + Duration::seconds(secs),
        end_time: None,
        status: "ok".to_string(),
        input: Value::Null,
        output: Value::Null,
    }
}

pub fn spans_with_outputs(outputs: &[Value]) -> Vec<SpanRecord> {
    let trace = TraceId::new();
    outputs
        .iter()
        .zip(0..)
        .map(|(output, secs)| SpanRecord {
            output: output.clone(),
            ..span_at(trace, None, "tool_call", "step", secs)
        })
        .collect()
}

/// One trace with a single agent and four spans:
/// `llm_call plan`, `agent_message relay`, `tool_call search`, `handoff delegate`.
pub struct TraceFixture {
    pub store: Arc<MemoryStore>,
    pub trace_id: TraceId,
    pub agent_id: AgentId,
    pub spans: Vec<SpanRecord>,
}

impl TraceFixture {
    pub async fn seeded() -> Self {
        Self::seeded_with(AgentConfig::named("planner").with_model("gpt-4")).await
    }

    pub async fn seeded_with(config: AgentConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let trace_id = TraceId::new();
        let agent_id = AgentId::new();
        store
            .put_agent(AgentRecord {
                agent_id,
                trace_id,
                config,
            })
            .await
            .unwrap();

        let agent = Some(agent_id);
        let spans = vec![
            SpanRecord {
                input: json!({"q": "x"}),
                output: json!({"r": "y"}),
                ..span_at(trace_id, agent, "llm_call", "plan", 0)
            },
            SpanRecord {
                input: json!({"message": "go"}),
                output: json!({"relayed": true}),
                ..span_at(trace_id, agent, "agent_message", "relay", 1)
            },
            SpanRecord {
                input: json!({"query": "weather"}),
                output: json!({"results": [1, 2]}),
                ..span_at(trace_id, agent, "tool_call", "search", 2)
            },
            SpanRecord {
                input: json!({"task": "write"}),
                output: json!({"to": "writer"}),
                ..span_at(trace_id, agent, "handoff", "delegate", 3)
            },
        ];
        for span in &spans {
            store.put_span(span.clone()).await.unwrap();
        }

        Self {
            store,
            trace_id,
            agent_id,
            spans,
        }
    }
}

/// A memory store with switchable faults
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    corrupt_state: bool,
    unreadable_checkpoints: bool,
    fail_insert_replay: bool,
    fail_stats: bool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a bit in every checkpoint blob on read
    pub fn corrupt_state(mut self) -> Self {
        self.corrupt_state = true;
        self
    }

    /// Report every stored checkpoint as unreadable
    pub fn unreadable_checkpoints(mut self) -> Self {
        self.unreadable_checkpoints = true;
        self
    }

    pub fn fail_insert_replay(mut self) -> Self {
        self.fail_insert_replay = true;
        self
    }

    pub fn fail_stats(mut self) -> Self {
        self.fail_stats = true;
        self
    }
}

#[async_trait]
impl StateStore for FaultyStore {
    async fn put_span(&self, span: SpanRecord) -> StoreResult<()> {
        self.inner.put_span(span).await
    }

    async fn put_agent(&self, agent: AgentRecord) -> StoreResult<()> {
        self.inner.put_agent(agent).await
    }

    async fn get_span(&self, span_id: SpanId) -> StoreResult<Option<SpanRecord>> {
        self.inner.get_span(span_id).await
    }

    async fn list_spans(&self, trace_id: TraceId) -> StoreResult<Vec<SpanRecord>> {
        self.inner.list_spans(trace_id).await
    }

    async fn get_agent(&self, agent_id: AgentId) -> StoreResult<Option<AgentRecord>> {
        self.inner.get_agent(agent_id).await
    }

    async fn insert_checkpoint(
        &self,
        record: CheckpointRecord,
        state: Vec<u8>,
    ) -> StoreResult<bool> {
        self.inner.insert_checkpoint(record, state).await
    }

    async fn get_checkpoint(&self, id: &CheckpointId) -> StoreResult<Option<StoredCheckpoint>> {
        let mut stored = self.inner.get_checkpoint(id).await?;
        if self.unreadable_checkpoints && stored.is_some() {
            return Err(StoreError::corrupted(id, "missing state blob"));
        }
        if self.corrupt_state {
            if let Some(byte) = stored.as_mut().and_then(|s| s.state.last_mut()) {
                *byte ^= 0x01;
            }
        }
        Ok(stored)
    }

    async fn list_checkpoints(&self, trace_id: TraceId) -> StoreResult<Vec<CheckpointRecord>> {
        self.inner.list_checkpoints(trace_id).await
    }

    async fn delete_checkpoint(&self, id: &CheckpointId) -> StoreResult<usize> {
        self.inner.delete_checkpoint(id).await
    }

    async fn insert_replay(&self, record: ReplayRecord) -> StoreResult<()> {
        if self.fail_insert_replay {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.insert_replay(record).await
    }

    async fn get_replay(&self, id: ReplayId) -> StoreResult<Option<ReplayRecord>> {
        self.inner.get_replay(id).await
    }

    async fn list_replays(&self, trace_id: TraceId) -> StoreResult<Vec<ReplayRecord>> {
        self.inner.list_replays(trace_id).await
    }

    async fn increment_replay_stats(&self, id: &CheckpointId) -> StoreResult<()> {
        if self.fail_stats {
            return Err(StoreError::Backend("stats table locked".into()));
        }
        self.inner.increment_replay_stats(id).await
    }

    async fn delete_trace(&self, trace_id: TraceId) -> StoreResult<usize> {
        self.inner.delete_trace(trace_id).await
    }
}
