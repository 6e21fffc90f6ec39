//! Replay requests and their recorded outcomes.

use crate::diff::Diff;
use crate::id::{CheckpointId, ReplayId, SpanId, TraceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options for a single replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Replaces the recorded input when present
    pub modified_input: Option<Value>,
    /// Agent configuration overrides (model, temperature, ...)
    pub agent_overrides: Option<Map<String, Value>>,
    /// Deadline for the executor call
    pub timeout_seconds: u64,
    /// Use the mock executor instead of the agent's framework
    pub dry_run: bool,
    /// Reserved for partial replays; carried and persisted but not acted on
    pub stop_at_span: Option<SpanId>,
}

impl ReplayConfig {
    /// Default executor deadline
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

    /// Replace the recorded input
    #[must_use]
    pub fn with_modified_input(mut self, input: Value) -> Self {
        self.modified_input = Some(input);
        self
    }

    /// Set agent overrides
    #[must_use]
    pub fn with_overrides(mut self, overrides: Map<String, Value>) -> Self {
        self.agent_overrides = Some(overrides);
        self
    }

    /// Set the executor deadline
    #[must_use]
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Route to the mock executor
    #[must_use]
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            modified_input: None,
            agent_overrides: None,
            timeout_seconds: Self::DEFAULT_TIMEOUT_SECONDS,
            dry_run: false,
            stop_at_span: None,
        }
    }
}

/// Outcome of one replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Replay identifier
    pub replay_id: ReplayId,
    /// Checkpoint the replay started from
    pub checkpoint_id: CheckpointId,
    /// Output recorded on the original span
    pub original_output: Value,
    /// Output of the replay; `null` when it failed
    pub replay_output: Value,
    /// Structural comparison of the two outputs
    pub diff: Diff,
    /// Whether the executor produced an output in time
    pub success: bool,
    /// Failure description
    pub error: Option<String>,
    /// Wall time spent in the executor
    pub duration_ms: u64,
    /// Tokens reported by the replay output
    pub tokens_used: Option<u64>,
    /// Cost reported by the replay output
    pub cost_usd: Option<f64>,
}

/// A persisted replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// The outcome
    #[serde(flatten)]
    pub result: ReplayResult,
    /// Owning trace
    pub trace_id: TraceId,
    /// Options the replay ran with
    pub config: ReplayConfig,
    /// When the record was written
    pub created_at: DateTime<Utc>,
}

impl ReplayRecord {
    /// Listing view of this record
    #[must_use]
    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            replay_id: self.result.replay_id,
            checkpoint_id: self.result.checkpoint_id.clone(),
            success: self.result.success,
            error: self.result.error.clone(),
            duration_ms: self.result.duration_ms,
            tokens_used: self.result.tokens_used,
            cost_usd: self.result.cost_usd,
            created_at: self.created_at,
        }
    }
}

/// Replay metadata for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// Replay identifier
    pub replay_id: ReplayId,
    /// Checkpoint the replay started from
    pub checkpoint_id: CheckpointId,
    /// Whether the replay succeeded
    pub success: bool,
    /// Failure description
    pub error: Option<String>,
    /// Wall time spent in the executor
    pub duration_ms: u64,
    /// Tokens reported by the replay output
    pub tokens_used: Option<u64>,
    /// Cost reported by the replay output
    pub cost_usd: Option<f64>,
    /// When the record was written
    pub created_at: DateTime<Utc>,
}
