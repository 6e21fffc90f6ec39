//! API server and routes

use crate::error::ApiError;
use agentrace_core::{
    CheckpointId, CheckpointSummary, Diff, ReplayId, ReplayResult, ReplaySummary, SpanId, TraceId,
};
use agentrace_replay::{CheckpointDetail, Overrides, ReplayService};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// Body of `POST /traces/{trace_id}/checkpoints`
#[derive(Debug, Deserialize)]
pub struct CreateCheckpointsRequest {
    /// Checkpoint every handoff, tool call and LLM call
    #[serde(default = "enabled")]
    pub auto: bool,
}

fn enabled() -> bool {
    true
}

/// Identifiers of created checkpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCheckpointsResponse {
    /// Created identifiers, in span order
    pub checkpoint_ids: Vec<CheckpointId>,
    /// Number of identifiers
    pub count: usize,
}

/// Body of `POST /checkpoints/{checkpoint_id}/replay`
///
/// A missing timeout falls back to the server default.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReplayRequest {
    /// Replacement input
    pub modified_input: Option<Value>,
    /// Agent configuration overrides
    pub agent_overrides: Option<Overrides>,
    /// Deadline in seconds
    pub timeout_seconds: Option<u64>,
    /// Use the mock executor
    pub dry_run: bool,
    /// Reserved
    pub stop_at_span: Option<SpanId>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn parse_checkpoint_id(raw: &str) -> Result<CheckpointId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("Checkpoint not found: {raw}")))
}

fn parse_replay_id(raw: &str) -> Result<ReplayId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound(format!("Replay not found: {raw}")))
}

async fn list_checkpoints(
    State(service): State<ReplayService>,
    Path(trace_id): Path<TraceId>,
) -> Result<Json<Vec<CheckpointSummary>>, ApiError> {
    Ok(Json(service.list_checkpoints(trace_id).await?))
}

async fn create_checkpoints(
    State(service): State<ReplayService>,
    Path(trace_id): Path<TraceId>,
    Json(request): Json<CreateCheckpointsRequest>,
) -> Result<(StatusCode, Json<CreateCheckpointsResponse>), ApiError> {
    let checkpoint_ids = service.create_checkpoints(trace_id, request.auto).await?;
    let count = checkpoint_ids.len();
    Ok((
        StatusCode::CREATED,
        Json(CreateCheckpointsResponse {
            checkpoint_ids,
            count,
        }),
    ))
}

async fn get_checkpoint(
    State(service): State<ReplayService>,
    Path(raw): Path<String>,
) -> Result<Json<CheckpointDetail>, ApiError> {
    let id = parse_checkpoint_id(&raw)?;
    Ok(Json(service.get_checkpoint(&id).await?))
}

async fn delete_checkpoint(
    State(service): State<ReplayService>,
    Path(raw): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_checkpoint_id(&raw)?;
    service.delete_checkpoint(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn execute_replay(
    State(service): State<ReplayService>,
    Path(raw): Path<String>,
    Json(request): Json<ReplayRequest>,
) -> Result<(StatusCode, Json<ReplayResult>), ApiError> {
    let id = parse_checkpoint_id(&raw)?;

    let mut config = service.config().replay_config();
    config.modified_input = request.modified_input;
    config.agent_overrides = request.agent_overrides;
    config.dry_run = request.dry_run;
    config.stop_at_span = request.stop_at_span;
    if let Some(seconds) = request.timeout_seconds {
        config.timeout_seconds = seconds;
    }

    let result = service.execute_replay(&id, config).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

async fn get_replay(
    State(service): State<ReplayService>,
    Path(raw): Path<String>,
) -> Result<Json<ReplayResult>, ApiError> {
    let id = parse_replay_id(&raw)?;
    Ok(Json(service.get_replay(id).await?))
}

async fn get_replay_diff(
    State(service): State<ReplayService>,
    Path(raw): Path<String>,
) -> Result<Json<Diff>, ApiError> {
    let id = parse_replay_id(&raw)?;
    Ok(Json(service.get_replay_diff(id).await?))
}

async fn list_replays(
    State(service): State<ReplayService>,
    Path(trace_id): Path<TraceId>,
) -> Result<Json<Vec<ReplaySummary>>, ApiError> {
    Ok(Json(service.list_replays(trace_id).await?))
}

/// Build the router over `service`
pub fn router(service: ReplayService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/traces/{trace_id}/checkpoints",
            get(list_checkpoints).post(create_checkpoints),
        )
        .route(
            "/checkpoints/{checkpoint_id}",
            get(get_checkpoint).delete(delete_checkpoint),
        )
        .route("/checkpoints/{checkpoint_id}/replay", post(execute_replay))
        .route("/replays/{replay_id}", get(get_replay))
        .route("/replays/{replay_id}/diff", get(get_replay_diff))
        .route("/traces/{trace_id}/replays", get(list_replays))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// HTTP server bound to one address
pub struct ApiServer {
    addr: SocketAddr,
    service: ReplayService,
}

impl ApiServer {
    /// Create a server for `bind`
    ///
    /// # Errors
    ///
    /// Returns error if `bind` is not a socket address
    pub fn new(bind: &str, service: ReplayService) -> anyhow::Result<Self> {
        Ok(Self {
            addr: bind.parse()?,
            service,
        })
    }

    /// Serve until the process stops
    ///
    /// # Errors
    ///
    /// Returns error if the address cannot be bound
    pub async fn serve(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on http://{}", self.addr);
        axum::serve(listener, router(self.service)).await?;
        Ok(())
    }
}
