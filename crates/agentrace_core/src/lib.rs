//! AGENTRACE Core Types
//!
//! This crate contains pure types and logic with no I/O: identifiers,
//! canonical state encoding, checkpoint identity, and the records produced
//! by replays and diffs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
pub mod diff;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod id;
pub mod model;
pub mod replay;

// Re-exports
pub use checkpoint::{Checkpoint, CheckpointRecord, CheckpointState, CheckpointSummary};
pub use diff::{Diff, TypeChange, ValueChange};
pub use encoding::{canonicalize, decode_state, encode_state};
pub use error::{CoreError, CoreResult};
pub use hash::{HashAlgorithm, StateHash};
pub use id::{AgentId, CheckpointId, ReplayId, SpanId, TraceId};
pub use model::{AgentConfig, AgentRecord, SpanKind, SpanRecord};
pub use replay::{ReplayConfig, ReplayRecord, ReplayResult, ReplaySummary};
