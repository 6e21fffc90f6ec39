//! Checkpoint manager: save, load, list and auto-create checkpoints.

use crate::error::{EngineResult, ReplayError};
use agentrace_core::{
    Checkpoint, CheckpointId, CheckpointRecord, CheckpointSummary, HashAlgorithm, SpanId,
    SpanRecord, TraceId,
};
use agentrace_store::{StateStore, StoreError, StoredCheckpoint};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, info};

const UNKNOWN: &str = "unknown";

/// Persists checkpoints and builds them from recorded spans
#[derive(Clone)]
pub struct CheckpointManager {
    store: Arc<dyn StateStore>,
    algorithm: HashAlgorithm,
}

impl CheckpointManager {
    /// Create a manager over `store`
    #[must_use]
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            algorithm: HashAlgorithm::default(),
        }
    }

    /// Fingerprint new checkpoints with `algorithm`
    #[must_use]
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// The underlying store
    #[must_use]
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    /// Persist a checkpoint; saving an existing checkpoint is a no-op
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::PersistenceFailure`] if the store fails
    pub async fn save(&self, checkpoint: &Checkpoint) -> EngineResult<CheckpointId> {
        let inserted = self
            .store
            .insert_checkpoint(checkpoint.record().clone(), checkpoint.state_bytes().to_vec())
            .await?;
        if !inserted {
            debug!(checkpoint_id = %checkpoint.id(), "checkpoint already saved");
        }
        Ok(checkpoint.id().clone())
    }

    async fn fetch(&self, id: &CheckpointId) -> EngineResult<StoredCheckpoint> {
        match self.store.get_checkpoint(id).await {
            Ok(stored) => stored.ok_or_else(|| ReplayError::checkpoint_not_found(id)),
            Err(StoreError::Corrupted { reason, .. }) => Err(ReplayError::CheckpointCorrupted {
                id: id.clone(),
                reason,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Load a checkpoint by exact identifier
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::CheckpointNotFound`] if absent and
    /// [`ReplayError::CheckpointCorrupted`] if the stored state fails
    /// integrity checks or decoding
    pub async fn load(&self, id: &CheckpointId) -> EngineResult<Checkpoint> {
        let stored = self.fetch(id).await?;
        Checkpoint::from_stored(stored.record, stored.state).map_err(|e| {
            ReplayError::CheckpointCorrupted {
                id: id.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Checkpoints of a trace joined with agent and span details, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if the store fails
    pub async fn list_for_trace(&self, trace_id: TraceId) -> EngineResult<Vec<CheckpointSummary>> {
        let records = self.store.list_checkpoints(trace_id).await?;
        let mut summaries = Vec::with_capacity(records.len());
        for record in records {
            summaries.push(self.summarize(record).await?);
        }
        Ok(summaries)
    }

    /// Joined details of a single checkpoint
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::CheckpointNotFound`] if absent
    pub async fn summary(&self, id: &CheckpointId) -> EngineResult<CheckpointSummary> {
        let stored = self.fetch(id).await?;
        self.summarize(stored.record).await
    }

    async fn summarize(&self, record: CheckpointRecord) -> EngineResult<CheckpointSummary> {
        let agent_name = match record.agent_id {
            Some(agent_id) => self.store.get_agent(agent_id).await?.map(|a| a.config.name),
            None => None,
        };
        let span = self.store.get_span(record.span_id()).await?;

        Ok(CheckpointSummary {
            span_id: record.span_id(),
            agent_id: record.agent_id,
            agent_name: agent_name.unwrap_or_else(|| UNKNOWN.to_string()),
            span_name: span.as_ref().map_or_else(|| UNKNOWN.to_string(), |s| s.name.clone()),
            span_kind: span
                .as_ref()
                .map_or_else(|| UNKNOWN.to_string(), |s| s.kind.to_string()),
            name: record.name,
            timestamp: record.timestamp,
            replay_count: record.replay_count,
            last_replayed: record.last_replayed,
            checkpoint_id: record.checkpoint_id,
        })
    }

    /// Delete a checkpoint; returns whether anything was removed
    ///
    /// # Errors
    ///
    /// Returns error if the store fails
    pub async fn delete(&self, id: &CheckpointId) -> EngineResult<bool> {
        let removed = self.store.delete_checkpoint(id).await?;
        if removed > 0 {
            info!(checkpoint_id = %id, "deleted checkpoint");
        }
        Ok(removed > 0)
    }

    /// Checkpoint a single span
    ///
    /// The name defaults to `manual:{kind}:{span name}`.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::SpanNotFound`] if the span is unknown
    pub async fn create_for_span(
        &self,
        span_id: SpanId,
        name: Option<String>,
    ) -> EngineResult<CheckpointId> {
        let span = self
            .store
            .get_span(span_id)
            .await?
            .ok_or(ReplayError::SpanNotFound(span_id))?;
        let spans = self.store.list_spans(span.trace_id).await?;
        let name = name.unwrap_or_else(|| format!("manual:{}:{}", span.kind, span.name));

        let checkpoint = self.checkpoint_span(&span, &spans, name).await?;
        let id = self.save(&checkpoint).await?;
        info!(checkpoint_id = %id, "created checkpoint");
        Ok(id)
    }

    /// Checkpoint every handoff, tool call and LLM call of a trace
    ///
    /// Spans are visited in start-time order and the identifiers are
    /// returned in that order.
    ///
    /// # Errors
    ///
    /// Returns error if the store fails or a state cannot be encoded
    pub async fn auto_checkpoint_trace(
        &self,
        trace_id: TraceId,
    ) -> EngineResult<Vec<CheckpointId>> {
        let spans = self.store.list_spans(trace_id).await?;
        let mut ids = Vec::new();

        for span in spans.iter().filter(|s| s.kind.is_checkpointable()) {
            let name = format!("auto:{}:{}", span.kind, span.name);
            let checkpoint = self.checkpoint_span(span, &spans, name).await?;
            ids.push(self.save(&checkpoint).await?);
        }

        info!(%trace_id, count = ids.len(), "auto-checkpointed trace");
        Ok(ids)
    }

    async fn checkpoint_span(
        &self,
        span: &SpanRecord,
        trace_spans: &[SpanRecord],
        name: String,
    ) -> EngineResult<Checkpoint> {
        let agent_config = match span.agent_id {
            Some(agent_id) => self
                .store
                .get_agent_config(agent_id)
                .await?
                .map(|config| config.to_state_value()),
            None => None,
        };

        let state = json!({
            "input": span.input,
            "output": span.output,
            "prior_output": prior_output(span, trace_spans),
            "agent_config": agent_config.unwrap_or_else(|| json!({})),
            "span_kind": span.kind,
            "span_name": span.name,
        });

        Ok(Checkpoint::create_with(
            self.algorithm,
            span.trace_id,
            span.span_id,
            span.agent_id,
            name,
            state,
        )?)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Output of the latest span that started strictly before `span`, or `{}`
fn prior_output(span: &SpanRecord, trace_spans: &[SpanRecord]) -> Value {
    trace_spans
        .iter()
        .filter(|s| s.start_time < span.start_time)
        .max_by_key(|s| s.start_time)
        .map(|s| &s.output)
        .filter(|output| !is_blank(output))
        .cloned()
        .unwrap_or_else(|| json!({}))
}
