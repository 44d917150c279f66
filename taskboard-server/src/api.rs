//! REST API of the task service.
//!
//! | Method | Path          | Success                |
//! |--------|---------------|------------------------|
//! | GET    | `/tasks`      | 200 with all tasks     |
//! | POST   | `/tasks`      | 201 with the new task  |
//! | PATCH  | `/tasks/{id}` | 200 with the task      |
//! | DELETE | `/tasks/{id}` | 204                    |
//! | GET    | `/health`     | 200                    |
//!
//! Errors carry an [`ApiError`] body: 400 for malformed JSON, 404 for
//! unknown ids, 422 for validation failures and 503 for injected faults.
//! `/health` bypasses fault injection.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use taskboard_proto::api::{self, ApiError, HEALTH_PATH, TASKS_PATH};
use taskboard_proto::task::{NewTask, TaskId, TaskPatch, ValidationError};

use crate::faults::FaultInjector;
use crate::table::TaskTable;

/// Shared server state.
#[derive(Debug, Default)]
pub struct ApiState {
    /// Stored tasks.
    pub table: TaskTable,
    /// Fault injection settings.
    pub faults: FaultInjector,
}

impl ApiState {
    /// Creates a state with an empty table and no fault injection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state from explicit parts.
    #[must_use]
    pub const fn with_parts(table: TaskTable, faults: FaultInjector) -> Self {
        Self { table, faults }
    }
}

/// Request failures, rendered as an [`ApiError`] body.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Body was not valid JSON for the endpoint.
    #[error("malformed request body: {0}")]
    Malformed(String),

    /// Payload failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// No task with this id.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// Failure produced by the fault injector.
    #[error("injected failure")]
    Injected,
}

impl ServerError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Injected => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = status.as_u16(), error = %self, "request failed");
        (status, Json(ApiError::new(self.to_string()))).into_response()
    }
}

fn decode_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ServerError> {
    api::decode(body).map_err(|e| ServerError::Malformed(e.to_string()))
}

/// Builds the router over `state`.
pub fn router(state: Arc<ApiState>) -> Router {
    let tasks = Router::new()
        .route(TASKS_PATH, get(list_tasks).post(create_task))
        .route("/tasks/{id}", patch(update_task).delete(delete_task))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            inject_faults,
        ));

    Router::new()
        .merge(tasks)
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

/// Starts the server on the given address and returns the bound address
/// and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(ApiState::new())).await
}

/// Starts the server with a pre-built [`ApiState`]. Pass `127.0.0.1:0` to
/// get an OS-assigned port.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ApiState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "task server error");
        }
    });

    Ok((bound_addr, handle))
}

async fn inject_faults(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.faults.should_fail().await {
        tracing::info!(method = %request.method(), path = %request.uri().path(), "injecting failure");
        return ServerError::Injected.into_response();
    }
    next.run(request).await
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn list_tasks(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    Json(state.table.list().await)
}

async fn create_task(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ServerError> {
    let new: NewTask = decode_body(&body)?;
    let task = state.table.create(new).await?;
    tracing::info!(task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ServerError> {
    let id = TaskId::from(id);
    let patch: TaskPatch = decode_body(&body)?;
    let task = state
        .table
        .update(&id, &patch)
        .await?
        .ok_or_else(|| ServerError::NotFound(id.clone()))?;
    tracing::info!(task_id = %id, status = %task.status, "task updated");
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let id = TaskId::from(id);
    if state.table.delete(&id).await {
        tracing::info!(task_id = %id, "task deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound(id))
    }
}

/// Starts the server in-process for testing on an OS-assigned port.
#[cfg(test)]
pub async fn start_test_server(
    state: Arc<ApiState>,
) -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start test server")
}
