//! REST endpoint core: shared state, routes, and handlers.
//!
//! Exposes a single `tasks` resource over the store:
//!
//! | Verb     | Path          | Effect                       |
//! |----------|---------------|------------------------------|
//! | `GET`    | `/tasks`      | list all tasks               |
//! | `POST`   | `/tasks`      | create (id assigned if absent) |
//! | `GET`    | `/tasks/{id}` | fetch one                    |
//! | `PUT`    | `/tasks/{id}` | full replace                 |
//! | `PATCH`  | `/tasks/{id}` | partial merge                |
//! | `DELETE` | `/tasks/{id}` | remove                       |
//!
//! The same routes are also served under `/api`.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tasklist_proto::task::{NewTask, Task, TaskId, TaskPatch};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::store::{StoreError, TaskStore};

/// Shared server state.
pub struct ServerState {
    /// The task collection.
    pub store: TaskStore,
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(TaskStore::in_memory())
    }
}

impl ServerState {
    /// Wraps an opened store.
    #[must_use]
    pub const fn new(store: TaskStore) -> Self {
        Self { store }
    }
}

/// Error returned by handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(raw_id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("task {raw_id} not found"),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let status = match &e {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::IdsExhausted => StatusCode::INSUFFICIENT_STORAGE,
            StoreError::Io { .. } | StoreError::Format { .. } => {
                tracing::error!(error = %e, "store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Body of a full-replace request. `completed` falls back to `false`.
#[derive(Debug, Deserialize)]
struct ReplaceBody {
    title: String,
    #[serde(default)]
    completed: bool,
}

/// Builds the application router with CORS and request tracing.
pub fn router(state: Arc<ServerState>) -> axum::Router {
    let tasks = axum::Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task)
                .put(replace_task)
                .patch(merge_task)
                .delete(delete_task),
        );

    axum::Router::new()
        .merge(tasks.clone())
        .nest("/api", tasks)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the server on the given address with an in-memory store.
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
    start_server_with_state(addr, Arc::new(ServerState::default())).await
}

/// Starts the server with a pre-built [`ServerState`].
///
/// Returns the bound address (useful with port `0`) and the serving task.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<ServerState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    serve(addr, router(state)).await
}

/// Serves an arbitrary router, e.g. [`router`] wrapped in extra layers.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn serve(
    addr: &str,
    app: axum::Router,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Starts the server in-process for testing on `127.0.0.1:0`.
#[cfg(test)]
pub async fn start_test_server() -> (std::net::SocketAddr, tokio::task::JoinHandle<()>) {
    start_server("127.0.0.1:0")
        .await
        .expect("failed to start test server")
}

/// Unparsable ids cannot name a stored task, so they are a plain 404.
fn parse_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found(raw))
}

async fn list_tasks(State(state): State<Arc<ServerState>>) -> Json<Vec<Task>> {
    let tasks = state.store.list().await;
    tracing::debug!(count = tasks.len(), "listing tasks");
    Json(tasks)
}

async fn get_task(
    State(state): State<Arc<ServerState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&raw_id)?;
    Ok(Json(state.store.get(id).await?))
}

async fn create_task(
    State(state): State<Arc<ServerState>>,
    Json(new): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.store.create(new).await?;
    tracing::info!(id = %task.id, title = %task.title, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

async fn replace_task(
    State(state): State<Arc<ServerState>>,
    Path(raw_id): Path<String>,
    Json(body): Json<ReplaceBody>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&raw_id)?;
    let task = state
        .store
        .replace(id, body.title, body.completed)
        .await?;
    tracing::info!(id = %id, "task replaced");
    Ok(Json(task))
}

async fn merge_task(
    State(state): State<Arc<ServerState>>,
    Path(raw_id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&raw_id)?;
    let task = state.store.merge(id, &patch).await?;
    tracing::info!(id = %id, "task patched");
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<Arc<ServerState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&raw_id)?;
    let task = state.store.remove(id).await?;
    tracing::info!(id = %id, "task deleted");
    Ok(Json(task))
}
