//! Flat-file task store backing the REST endpoint.
//!
//! The [`TaskStore`] keeps the collection in memory behind a [`RwLock`] and,
//! when opened with a path, rewrites a JSON file of the form
//! `{"tasks": [...]}` after every successful mutation. The file is written
//! to a sibling temp file and renamed into place, so a crash mid-write
//! leaves the previous contents intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tasklist_proto::codec;
use tasklist_proto::task::{NewTask, Task, TaskId, TaskPatch};
use tokio::sync::RwLock;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No task with the given id exists.
    #[error("task {0} not found")]
    NotFound(TaskId),
    /// A create request named an id that is already taken.
    #[error("task {0} already exists")]
    Conflict(TaskId),
    /// The highest stored id is `u64::MAX`, so no id can be assigned.
    #[error("no task id left to assign")]
    IdsExhausted,
    /// Reading or writing the database file failed.
    #[error("database file {path}: {source}")]
    Io {
        /// File that was being read or written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The database file could not be parsed or serialized.
    #[error("database file {path} is not valid: {reason}")]
    Format {
        /// File that was being read or written.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
}

/// On-disk layout of the database file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Database {
    #[serde(default)]
    tasks: Vec<Task>,
}

/// Task collection with optional flat-file persistence.
///
/// Every mutation holds the write lock across the file rewrite, so the file
/// always reflects a state the in-memory map actually passed through.
pub struct TaskStore {
    tasks: RwLock<BTreeMap<TaskId, Task>>,
    path: Option<PathBuf>,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl TaskStore {
    /// Creates an empty store that never touches the filesystem.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            tasks: RwLock::new(BTreeMap::new()),
            path: None,
        }
    }

    /// Opens a store backed by the JSON file at `path`.
    ///
    /// A missing file is treated as an empty collection and is created on
    /// the first mutation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read, or
    /// [`StoreError::Format`] if it is not a valid database.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let database = match tokio::fs::read(&path).await {
            Ok(bytes) => parse_database(&path, &bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "database file missing, starting empty");
                Database::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let tasks: BTreeMap<TaskId, Task> =
            database.tasks.into_iter().map(|t| (t.id, t)).collect();
        tracing::info!(path = %path.display(), count = tasks.len(), "database loaded");

        Ok(Self {
            tasks: RwLock::new(tasks),
            path: Some(path),
        })
    }

    /// Returns the path of the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns every task, in ascending id order.
    pub async fn list(&self) -> Vec<Task> {
        self.tasks.read().await.values().cloned().collect()
    }

    /// Returns the task with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such task exists.
    pub async fn get(&self, id: TaskId) -> Result<Task, StoreError> {
        self.tasks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// Inserts a new task, assigning `max + 1` when the payload has no id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] if the id is already taken,
    /// [`StoreError::IdsExhausted`] if no id is left after the highest one,
    /// or a persistence error if the file rewrite fails.
    pub async fn create(&self, new: NewTask) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let id = match new.id {
            Some(id) => id,
            None => {
                TaskId::after_max(tasks.keys().copied()).ok_or(StoreError::IdsExhausted)?
            }
        };
        if tasks.contains_key(&id) {
            return Err(StoreError::Conflict(id));
        }
        let task = Task::from_new(id, new);
        tasks.insert(id, task.clone());
        if let Err(e) = self.persist(&tasks).await {
            tasks.remove(&id);
            return Err(e);
        }
        drop(tasks);
        Ok(task)
    }

    /// Replaces the title and completion state of an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such task exists, or a
    /// persistence error if the file rewrite fails.
    pub async fn replace(
        &self,
        id: TaskId,
        title: String,
        completed: bool,
    ) -> Result<Task, StoreError> {
        self.mutate(id, |task| {
            task.title = title;
            task.completed = completed;
        })
        .await
    }

    /// Merges the fields present in `patch` into an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such task exists, or a
    /// persistence error if the file rewrite fails.
    pub async fn merge(&self, id: TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        self.mutate(id, |task| task.apply(patch)).await
    }

    /// Removes a task, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such task exists, or a
    /// persistence error if the file rewrite fails.
    pub async fn remove(&self, id: TaskId) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let removed = tasks.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Err(e) = self.persist(&tasks).await {
            tasks.insert(id, removed);
            return Err(e);
        }
        drop(tasks);
        Ok(removed)
    }

    /// Returns the number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Returns `true` if the store holds no tasks.
    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Applies `f` to an existing task and persists, rolling back on failure.
    async fn mutate(&self, id: TaskId, f: impl FnOnce(&mut Task)) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let previous = task.clone();
        f(task);
        let updated = task.clone();
        if let Err(e) = self.persist(&tasks).await {
            tasks.insert(id, previous);
            return Err(e);
        }
        drop(tasks);
        Ok(updated)
    }

    /// Rewrites the database file from `tasks`. No-op for in-memory stores.
    async fn persist(&self, tasks: &BTreeMap<TaskId, Task>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let database = Database {
            tasks: tasks.values().cloned().collect(),
        };
        let bytes = serde_json::to_vec_pretty(&database).map_err(|e| StoreError::Format {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), count = tasks.len(), "database written");
        Ok(())
    }
}

/// Parses database file contents, rejecting duplicate ids.
fn parse_database(path: &Path, bytes: &[u8]) -> Result<Database, StoreError> {
    let format_error = |reason: String| StoreError::Format {
        path: path.to_path_buf(),
        reason,
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Database::default());
    }
    let database: Database =
        serde_json::from_slice(bytes).map_err(|e| format_error(e.to_string()))?;
    codec::ensure_unique_ids(&database.tasks).map_err(|e| format_error(e.to_string()))?;
    Ok(database)
}
