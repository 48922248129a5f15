//! Webhook HTTP surface.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info};
use serde::Deserialize;
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::jobs::{EntityKind, JobQueue, JobSnapshot, QueueError, Trigger};

pub const ACCEPTED_MESSAGE: &str = "Задача выгрузки принята в обработку";

pub struct AppState {
    pub queue: JobQueue,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnloadRequest {
    pub entity_type: String,
    pub entity_id: String,
}

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/app/test", get(test_endpoint))
        .route("/app/unloading-tasks", post(unload_tasks))
        .route("/app/jobs/{id}", get(job_status))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(internal_error))
}

async fn test_endpoint() -> impl IntoResponse {
    Json(json!({ "message": "Test request successful!" }))
}

async fn unload_tasks(
    State(state): State<SharedState>,
    Json(request): Json<UnloadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    info!("Webhook data: {:?}", request);

    let kind = EntityKind::parse(&request.entity_type).ok_or_else(|| {
        ApiError::BadRequest("Invalid entityType. Must be 'project' or 'task'.".to_string())
    })?;

    let snapshot = state
        .queue
        .submit(Trigger::new(kind, request.entity_id))
        .map_err(|err| match err {
            QueueError::Full => ApiError::Unavailable("Report queue is full, try again later".to_string()),
            QueueError::Closed => ApiError::Unavailable("Report queue is shutting down".to_string()),
        })?;
    info!("Queued job {} for {} {}", snapshot.id, kind, snapshot.entity_id);

    Ok(Json(json!({ "message": ACCEPTED_MESSAGE, "jobId": snapshot.id })))
}

async fn job_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobSnapshot>, ApiError> {
    state
        .queue
        .status(&id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))
}

/// Binds `addr` and serves until Ctrl+C.
pub async fn serve(state: SharedState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

/// Panics escaping a handler become a bare 500; details only go to the log.
fn internal_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!("Unhandled error while serving request: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal Server Error" })),
    )
        .into_response()
}
