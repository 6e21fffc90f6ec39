//! AGENTRACE Server
//!
//! HTTP API over the checkpoint and replay service.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod error;

pub use api::{
    ApiServer, CreateCheckpointsRequest, CreateCheckpointsResponse, ReplayRequest, router,
};
pub use error::ApiError;
