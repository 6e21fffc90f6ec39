//! AGENTRACE Replay Engine
//!
//! Checkpoint management, executor selection, structural diffing and
//! replay orchestration over a [`agentrace_store::StateStore`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod executor;
pub mod registry;
pub mod service;

#[cfg(test)]
mod testing;

pub use checkpoint::CheckpointManager;
pub use config::EngineConfig;
pub use diff::{compute_diff, format_diff_for_display};
pub use engine::ReplayEngine;
pub use error::{EngineResult, ReplayError};
pub use executor::{
    AgentExecutor, ExecutorError, GenericExecutor, GraphRuntime, LangGraphExecutor, MockExecutor,
    Overrides,
};
pub use registry::ExecutorRegistry;
pub use service::{CheckpointDetail, ReplayService};
