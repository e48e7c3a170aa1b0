//! Typed access to the task persistence endpoint.
//!
//! [`TaskService`] is the only component that talks HTTP to the endpoint.
//! It validates every response body against the task shape, checks that a
//! task exists before mutating it, imposes display order on reads, and
//! aggregates per-item failures of bulk operations.

pub mod bulk;

pub use bulk::{BulkFailure, BulkOperation, ItemFailure};

use futures_util::future::join_all;
use reqwest::{Method, Response, StatusCode};
use tasklist_proto::codec::{self, DecodeError};
use tasklist_proto::task::{
    NewTask, SortOrder, Task, TaskId, TaskPatch, UpdateMode, seed_tasks, sort_tasks,
};
use url::Url;

/// Errors returned by [`TaskService`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The endpoint answered with a non-success status.
    #[error("endpoint returned {status_text} ({status})")]
    Endpoint {
        /// HTTP status received.
        status: StatusCode,
        /// Reason phrase for the status.
        status_text: String,
    },
    /// A task targeted for mutation does not exist. Detected before any
    /// mutating request is sent.
    #[error("task {0} not found")]
    NotFound(String),
    /// The highest id in the collection is `u64::MAX`; no id follows it.
    #[error("no task id left after the highest one")]
    IdsExhausted,
    /// One or more sub-requests of a bulk operation failed.
    #[error(transparent)]
    Bulk(#[from] BulkFailure),
    /// A response body did not match the task shape.
    #[error("invalid response body: {0}")]
    Decode(#[from] DecodeError),
    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ServiceError {
    fn endpoint(status: StatusCode) -> Self {
        Self::Endpoint {
            status,
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
        }
    }

    /// Returns the HTTP status if this is an [`ServiceError::Endpoint`] error.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Endpoint { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The base URL cannot have path segments appended (e.g. `mailto:`).
#[derive(Debug, thiserror::Error)]
#[error("unusable endpoint base URL: {0}")]
pub struct InvalidBaseUrl(pub Url);

/// Result of a successful single delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deleted {
    /// The task that was removed.
    pub id: TaskId,
    /// Status the endpoint answered with.
    pub status: StatusCode,
}

/// Client for the task persistence endpoint.
#[derive(Debug, Clone)]
pub struct TaskService {
    client: reqwest::Client,
    base_url: Url,
    seed: Vec<NewTask>,
}

impl TaskService {
    /// Creates a service for the endpoint rooted at `base_url`
    /// (e.g. `http://127.0.0.1:3005` or `http://host/api`).
    ///
    /// The client has no request timeout; calls wait until the endpoint
    /// answers or the connection fails.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBaseUrl`] if the URL cannot carry a path.
    pub fn new(base_url: Url) -> Result<Self, InvalidBaseUrl> {
        if base_url.cannot_be_a_base() {
            return Err(InvalidBaseUrl(base_url));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            seed: seed_tasks(),
        })
    }

    /// Replaces the seed set used by [`reset`](Self::reset).
    #[must_use]
    pub fn with_seed(mut self, seed: Vec<NewTask>) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the endpoint base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches every task, sorted by numeric id.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Endpoint`] on a non-success status, or
    /// [`ServiceError::Decode`] if the body is not a task array.
    pub async fn list(&self, order: SortOrder) -> Result<Vec<Task>, ServiceError> {
        let response = self.client.get(self.url(&["tasks"])).send().await?;
        let body = success_body(response).await?;
        let mut tasks = codec::decode_task_list(&body)?;
        sort_tasks(&mut tasks, order);
        tracing::debug!(count = tasks.len(), order = %order, "listed tasks");
        Ok(tasks)
    }

    /// Creates a task, returning it as echoed by the endpoint.
    ///
    /// If `new.id` is `None` the endpoint assigns the id.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Endpoint`] on a non-success status (409 when
    /// a pinned id is already taken).
    pub async fn create(&self, new: &NewTask) -> Result<Task, ServiceError> {
        let response = self
            .client
            .post(self.url(&["tasks"]))
            .json(new)
            .send()
            .await?;
        let task = codec::decode_task(&success_body(response).await?)?;
        tracing::info!(id = %task.id, title = %task.title, "task created");
        Ok(task)
    }

    /// Fetches one task by id.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Endpoint`] (status 404) if the endpoint has
    /// no such task.
    pub async fn find_by_id(&self, id: &str) -> Result<Task, ServiceError> {
        // URL paths cannot carry `.` or `..` as a segment; no task has either id.
        if matches!(id, "." | "..") {
            tracing::debug!(id = %id, "unaddressable task id");
            return Err(ServiceError::endpoint(StatusCode::NOT_FOUND));
        }
        let response = self.client.get(self.url(&["tasks", id])).send().await?;
        Ok(codec::decode_task(&success_body(response).await?)?)
    }

    /// Updates an existing task, by full replace or partial merge.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] without sending the update if the
    /// task does not exist, or [`ServiceError::Endpoint`] if the update
    /// itself is rejected.
    pub async fn update(
        &self,
        id: &str,
        patch: &TaskPatch,
        mode: UpdateMode,
    ) -> Result<Task, ServiceError> {
        self.ensure_exists(id).await?;

        let method = match mode {
            UpdateMode::Replace => Method::PUT,
            UpdateMode::Merge => Method::PATCH,
        };
        let response = self
            .client
            .request(method, self.url(&["tasks", id]))
            .json(patch)
            .send()
            .await?;
        let task = codec::decode_task(&success_body(response).await?)?;
        tracing::info!(id = %task.id, mode = ?mode, "task updated");
        Ok(task)
    }

    /// Flips the completion flag of `task` with a partial merge.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn toggle(&self, task: &Task) -> Result<Task, ServiceError> {
        let patch = TaskPatch::completion(!task.completed);
        self.update(&task.id.to_string(), &patch, UpdateMode::Merge)
            .await
    }

    /// Deletes an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] without sending the delete if the
    /// task does not exist, or [`ServiceError::Endpoint`] if the delete
    /// itself is rejected.
    pub async fn delete(&self, id: &str) -> Result<Deleted, ServiceError> {
        let task = self.ensure_exists(id).await?;

        let response = self
            .client
            .delete(self.url(&["tasks", id]))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::endpoint(status));
        }
        tracing::info!(id = %task.id, "task deleted");
        Ok(Deleted {
            id: task.id,
            status,
        })
    }

    /// Deletes every task, issuing all deletes concurrently.
    ///
    /// A failed delete does not stop the others, so on error some tasks may
    /// already be gone.
    ///
    /// # Errors
    ///
    /// Returns the listing error unchanged, or [`ServiceError::Bulk`]
    /// carrying every failed delete.
    pub async fn delete_all(&self) -> Result<Vec<Deleted>, ServiceError> {
        let tasks = self.list(SortOrder::Ascending).await?;
        tracing::info!(count = tasks.len(), "deleting all tasks");

        let results = join_all(tasks.iter().map(|task| async move {
            let target = task.id.to_string();
            let result = self.delete(&target).await;
            (target, result)
        }))
        .await;

        Ok(bulk::aggregate(BulkOperation::DeleteAll, results)?)
    }

    /// Deletes every task, then re-creates the seed set concurrently.
    ///
    /// Returns the created tasks in completion-independent order; callers
    /// needing a display order should sort.
    ///
    /// # Errors
    ///
    /// Returns any [`delete_all`](Self::delete_all) error unchanged, or
    /// [`ServiceError::Bulk`] carrying every failed create.
    pub async fn reset(&self) -> Result<Vec<Task>, ServiceError> {
        self.delete_all().await?;

        let results = join_all(self.seed.iter().map(|new| async move {
            (new.title.clone(), self.create(new).await)
        }))
        .await;

        let created = bulk::aggregate(BulkOperation::Reseed, results)?;
        tracing::info!(count = created.len(), "task list reset to seed");
        Ok(created)
    }

    /// Returns the id after the current maximum, or `1` for an empty
    /// collection.
    ///
    /// Not atomic with a later [`create`](Self::create): two callers can
    /// receive the same id. Leave `NewTask::id` unset to have the endpoint
    /// assign one instead.
    ///
    /// # Errors
    ///
    /// Same as [`list`](Self::list), plus [`ServiceError::IdsExhausted`]
    /// when the highest id is `u64::MAX`.
    pub async fn next_id(&self) -> Result<TaskId, ServiceError> {
        let tasks = self.list(SortOrder::Ascending).await?;
        TaskId::after_max(tasks.iter().map(|t| t.id)).ok_or(ServiceError::IdsExhausted)
    }

    /// Reads a task, mapping an endpoint 404 to [`ServiceError::NotFound`].
    async fn ensure_exists(&self, id: &str) -> Result<Task, ServiceError> {
        match self.find_by_id(id).await {
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                tracing::debug!(id = %id, "task missing, refusing mutation");
                Err(ServiceError::NotFound(id.to_string()))
            }
            other => other,
        }
    }

    /// Appends percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Returns the body of a success response, or the status as an error.
async fn success_body(response: Response) -> Result<Vec<u8>, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        tracing::debug!(status = %status, url = %response.url(), "endpoint rejected request");
        return Err(ServiceError::endpoint(status));
    }
    Ok(response.bytes().await?.to_vec())
}
