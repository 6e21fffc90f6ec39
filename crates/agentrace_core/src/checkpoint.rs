//! Checkpoints: point-in-time snapshots of agent state.
//!
//! A checkpoint's identity is derived from its content. The state is
//! canonicalized once, at creation, and the resulting bytes are what gets
//! hashed, persisted and later decoded. A checkpoint rebuilt from storage
//! re-verifies those bytes against the hash in its identifier.

use crate::encoding::{decode_state, encode_state};
use crate::error::CoreResult;
use crate::hash::{HashAlgorithm, StateHash};
use crate::id::{AgentId, CheckpointId, SpanId, TraceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Checkpoint metadata as persisted alongside the state bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Composite identifier
    pub checkpoint_id: CheckpointId,
    /// Agent whose state was captured
    pub agent_id: Option<AgentId>,
    /// Human-readable name (e.g. `auto:handoff:planner`)
    pub name: String,
    /// Algorithm that produced the state hash
    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Number of replays run from this checkpoint
    #[serde(default)]
    pub replay_count: u64,
    /// Time of the most recent replay
    #[serde(default)]
    pub last_replayed: Option<DateTime<Utc>>,
}

impl CheckpointRecord {
    /// Owning trace
    #[must_use]
    pub fn trace_id(&self) -> TraceId {
        self.checkpoint_id.trace_id()
    }

    /// Span the checkpoint was taken at
    #[must_use]
    pub fn span_id(&self) -> SpanId {
        self.checkpoint_id.span_id()
    }
}

/// A checkpoint with its decoded state
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    record: CheckpointRecord,
    state: Value,
    encoded: Vec<u8>,
}

impl Checkpoint {
    /// Create a checkpoint using the default hash algorithm
    ///
    /// # Errors
    ///
    /// Returns error if the state cannot be encoded
    pub fn create(
        trace_id: TraceId,
        span_id: SpanId,
        agent_id: Option<AgentId>,
        name: impl Into<String>,
        state: Value,
    ) -> CoreResult<Self> {
        Self::create_with(HashAlgorithm::default(), trace_id, span_id, agent_id, name, state)
    }

    /// Create a checkpoint with an explicit hash algorithm
    ///
    /// # Errors
    ///
    /// Returns error if the state cannot be encoded
    pub fn create_with(
        algorithm: HashAlgorithm,
        trace_id: TraceId,
        span_id: SpanId,
        agent_id: Option<AgentId>,
        name: impl Into<String>,
        state: Value,
    ) -> CoreResult<Self> {
        let encoded = encode_state(&state)?;
        let state_hash = StateHash::compute_with(algorithm, &encoded);
        // Decode from the canonical bytes so the in-memory state matches a later load.
        let state = decode_state(&encoded)?;

        Ok(Self {
            record: CheckpointRecord {
                checkpoint_id: CheckpointId::new(trace_id, span_id, state_hash),
                agent_id,
                name: name.into(),
                hash_algorithm: algorithm,
                timestamp: Utc::now(),
                replay_count: 0,
                last_replayed: None,
            },
            state,
            encoded,
        })
    }

    /// Rebuild a checkpoint from persisted metadata and state bytes
    ///
    /// # Errors
    ///
    /// Returns error if the bytes do not match the recorded hash or do not decode
    pub fn from_stored(record: CheckpointRecord, encoded: Vec<u8>) -> CoreResult<Self> {
        record
            .checkpoint_id
            .state_hash()
            .verify(record.hash_algorithm, &encoded)?;
        let state = decode_state(&encoded)?;
        Ok(Self {
            record,
            state,
            encoded,
        })
    }

    /// Composite identifier
    #[must_use]
    pub fn id(&self) -> &CheckpointId {
        &self.record.checkpoint_id
    }

    /// Owning trace
    #[must_use]
    pub fn trace_id(&self) -> TraceId {
        self.record.trace_id()
    }

    /// Span the checkpoint was taken at
    #[must_use]
    pub fn span_id(&self) -> SpanId {
        self.record.span_id()
    }

    /// Agent whose state was captured
    #[must_use]
    pub fn agent_id(&self) -> Option<AgentId> {
        self.record.agent_id
    }

    /// Checkpoint name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// State fingerprint
    #[must_use]
    pub fn state_hash(&self) -> &StateHash {
        self.record.checkpoint_id.state_hash()
    }

    /// Creation time
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.record.timestamp
    }

    /// Decoded state
    #[must_use]
    pub fn state(&self) -> &Value {
        &self.state
    }

    /// Typed view over the state fields
    #[must_use]
    pub fn view(&self) -> CheckpointState<'_> {
        CheckpointState(&self.state)
    }

    /// The canonical bytes that were hashed
    #[must_use]
    pub fn state_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Persisted metadata
    #[must_use]
    pub fn record(&self) -> &CheckpointRecord {
        &self.record
    }
}

static NULL: Value = Value::Null;

/// Read-only accessors for the well-known fields of checkpoint state.
///
/// Missing fields read as `null`; state is never rejected for its shape.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointState<'a>(pub &'a Value);

impl<'a> CheckpointState<'a> {
    /// Look up a top-level field
    #[must_use]
    pub fn field(&self, key: &str) -> &'a Value {
        self.0.get(key).unwrap_or(&NULL)
    }

    /// Recorded input
    #[must_use]
    pub fn input(&self) -> &'a Value {
        self.field("input")
    }

    /// Recorded output
    #[must_use]
    pub fn output(&self) -> &'a Value {
        self.field("output")
    }

    /// Output of the preceding span
    #[must_use]
    pub fn prior_output(&self) -> &'a Value {
        self.field("prior_output")
    }

    /// Agent configuration snapshot
    #[must_use]
    pub fn agent_config(&self) -> &'a Value {
        self.field("agent_config")
    }

    /// Framework named by the agent configuration
    #[must_use]
    pub fn framework(&self) -> Option<&'a str> {
        self.agent_config().get("framework").and_then(Value::as_str)
    }

    /// Kind of the captured span
    #[must_use]
    pub fn span_kind(&self) -> Option<&'a str> {
        self.field("span_kind").as_str()
    }

    /// Name of the captured span
    #[must_use]
    pub fn span_name(&self) -> Option<&'a str> {
        self.field("span_name").as_str()
    }
}

/// Checkpoint metadata joined with its agent and span, for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointSummary {
    /// Composite identifier
    pub checkpoint_id: CheckpointId,
    /// Checkpoint name
    pub name: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Span the checkpoint was taken at
    pub span_id: SpanId,
    /// Agent whose state was captured
    pub agent_id: Option<AgentId>,
    /// Agent name, or `unknown` when the agent record is gone
    pub agent_name: String,
    /// Span name, or `unknown` when the span record is gone
    pub span_name: String,
    /// Span kind, or `unknown` when the span record is gone
    pub span_kind: String,
    /// Number of replays run from this checkpoint
    pub replay_count: u64,
    /// Time of the most recent replay
    pub last_replayed: Option<DateTime<Utc>>,
}
