//! Unique identifiers for AGENTRACE entities.
//!
//! Traces, spans and agents are keyed by UUIDs assigned at ingestion.
//! Checkpoints are keyed by the composite `{trace_id}:{span_id}:{state_hash}`,
//! which is the only accepted textual form: lookups match it exactly.

use crate::error::{CoreError, CoreResult};
use crate::hash::StateHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get as UUID
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> CoreResult<Self> {
                Uuid::parse_str(s).map(Self).map_err(|e| CoreError::InvalidId {
                    reason: format!("{} {s:?}: {e}", stringify!($name)),
                })
            }
        }
    };
}

uuid_id! {
    /// Trace identifier - one end-to-end run of a multi-agent system
    TraceId
}

uuid_id! {
    /// Span identifier - one recorded operation within a trace
    SpanId
}

uuid_id! {
    /// Agent identifier - one participant in a trace
    AgentId
}

/// Replay identifier, displayed as `replay-{uuid}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReplayId(Uuid);

impl ReplayId {
    const PREFIX: &'static str = "replay-";

    /// Create a new random ReplayId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ReplayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

impl FromStr for ReplayId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let raw = s.strip_prefix(Self::PREFIX).ok_or_else(|| CoreError::InvalidId {
            reason: format!("replay id must start with {:?}: {s:?}", Self::PREFIX),
        })?;
        Uuid::parse_str(raw).map(Self).map_err(|e| CoreError::InvalidId {
            reason: format!("ReplayId {s:?}: {e}"),
        })
    }
}

impl TryFrom<String> for ReplayId {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        value.parse()
    }
}

impl From<ReplayId> for String {
    fn from(id: ReplayId) -> Self {
        id.to_string()
    }
}

/// Checkpoint identifier: `{trace_id}:{span_id}:{state_hash}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CheckpointId {
    trace_id: TraceId,
    span_id: SpanId,
    state_hash: StateHash,
}

impl CheckpointId {
    /// Assemble from parts
    #[must_use]
    pub const fn new(trace_id: TraceId, span_id: SpanId, state_hash: StateHash) -> Self {
        Self {
            trace_id,
            span_id,
            state_hash,
        }
    }

    /// Trace the checkpoint belongs to
    #[must_use]
    pub const fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Span the checkpoint was taken at
    #[must_use]
    pub const fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Fingerprint of the checkpoint state
    #[must_use]
    pub const fn state_hash(&self) -> &StateHash {
        &self.state_hash
    }
}

impl fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.trace_id, self.span_id, self.state_hash)
    }
}

impl FromStr for CheckpointId {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        let mut parts = s.split(':');
        let (Some(trace), Some(span), Some(hash), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CoreError::InvalidId {
                reason: format!("checkpoint id must be trace:span:hash, got {s:?}"),
            });
        };

        let id = Self {
            trace_id: trace.parse()?,
            span_id: span.parse()?,
            state_hash: StateHash::from_hex(hash)?,
        };

        // Only the canonical hyphenated lowercase form round-trips.
        if id.to_string() != s {
            return Err(CoreError::InvalidId {
                reason: format!("non-canonical checkpoint id {s:?}"),
            });
        }
        Ok(id)
    }
}

impl TryFrom<String> for CheckpointId {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        value.parse()
    }
}

impl From<CheckpointId> for String {
    fn from(id: CheckpointId) -> Self {
        id.to_string()
    }
}
