//! Application state and task-list orchestration.
//!
//! [`App`] holds the displayed collection and the form, calls the
//! [`TaskService`], and applies each mutation result to local state through
//! explicit transition methods. A full re-fetch happens on [`App::load`]
//! and when a mutation fails, to recover from whatever partial effect the
//! failure left behind.

use tasklist_proto::task::{NewTask, SortOrder, Task, TaskId, TaskPatch, UpdateMode, sort_tasks};

use crate::service::{ServiceError, TaskService};

/// Errors surfaced by controller actions.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The form title is blank after trimming.
    #[error("task title cannot be empty")]
    EmptyTitle,
    /// Clear was requested on an empty list.
    #[error("The list is already empty!")]
    AlreadyEmpty,
    /// The task is not in the displayed list.
    #[error("task {0} is not in the list")]
    UnknownTask(TaskId),
    /// Completion toggles are disabled while a task is being edited.
    #[error("finish or cancel the current edit first")]
    EditInProgress,
    /// The task service failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Form contents for adding or editing a task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    /// Title input.
    pub title: String,
    /// Completed checkbox.
    pub completed: bool,
}

/// Main application state.
#[derive(Debug, Default)]
pub struct App {
    tasks: Vec<Task>,
    /// Current form contents.
    pub form: TaskForm,
    editing: Option<TaskId>,
    order: SortOrder,
}

impl App {
    /// Creates an empty application displaying tasks in `order`.
    #[must_use]
    pub fn new(order: SortOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    /// Tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The task currently loaded into the form for editing.
    #[must_use]
    pub const fn editing(&self) -> Option<TaskId> {
        self.editing
    }

    /// Display order of the list.
    #[must_use]
    pub const fn order(&self) -> SortOrder {
        self.order
    }

    // -----------------------------------------------------------------------
    // State transitions
    // -----------------------------------------------------------------------

    /// Replaces the whole collection.
    pub fn replace_all(&mut self, mut tasks: Vec<Task>) {
        sort_tasks(&mut tasks, self.order);
        self.tasks = tasks;
        if self.editing.is_some_and(|id| self.find(id).is_none()) {
            self.reset_form();
        }
    }

    /// Adds a newly created task.
    pub fn apply_created(&mut self, task: Task) {
        self.tasks.retain(|t| t.id != task.id);
        self.tasks.push(task);
        sort_tasks(&mut self.tasks, self.order);
    }

    /// Replaces a task with its updated version.
    pub fn apply_updated(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.apply_created(task),
        }
    }

    /// Drops a deleted task, abandoning its edit if it was being edited.
    pub fn apply_removed(&mut self, id: TaskId) {
        self.tasks.retain(|t| t.id != id);
        if self.editing == Some(id) {
            self.reset_form();
        }
    }

    /// Empties the collection.
    pub fn apply_cleared(&mut self) {
        self.tasks.clear();
        self.reset_form();
    }

    /// Loads a task into the form for editing.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::UnknownTask`] if the task is not displayed.
    pub fn begin_edit(&mut self, id: TaskId) -> Result<(), AppError> {
        let form = self
            .find(id)
            .map(|task| TaskForm {
                title: task.title.clone(),
                completed: task.completed,
            })
            .ok_or(AppError::UnknownTask(id))?;
        self.form = form;
        self.editing = Some(id);
        Ok(())
    }

    /// Abandons the current edit and clears the form.
    pub fn cancel_edit(&mut self) {
        self.reset_form();
    }

    fn reset_form(&mut self) {
        self.form = TaskForm::default();
        self.editing = None;
    }

    fn find(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    /// Fetches the full collection from the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Service`] if the listing fails.
    pub async fn load(&mut self, service: &TaskService) -> Result<(), AppError> {
        let tasks = service.list(self.order).await?;
        self.replace_all(tasks);
        Ok(())
    }

    /// Submits the form: edits the task being edited, or adds a new one.
    ///
    /// The title is trimmed; the form is cleared on success.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EmptyTitle`] for a blank title, or
    /// [`AppError::Service`] if the endpoint call fails.
    pub async fn submit_form(&mut self, service: &TaskService) -> Result<Task, AppError> {
        let title = self.form.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::EmptyTitle);
        }

        let result = match self.editing {
            Some(id) => {
                let patch = TaskPatch::full(title, self.form.completed);
                service
                    .update(&id.to_string(), &patch, UpdateMode::Replace)
                    .await
            }
            None => {
                let new = NewTask::new(title).completed(self.form.completed);
                service.create(&new).await
            }
        };

        match result {
            Ok(task) => {
                self.apply_updated(task.clone());
                self.reset_form();
                Ok(task)
            }
            Err(e) => Err(self.recover(service, e).await),
        }
    }

    /// Flips a task's completion flag.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EditInProgress`] while editing,
    /// [`AppError::UnknownTask`] if the task is not displayed, or
    /// [`AppError::Service`] if the endpoint call fails.
    pub async fn toggle(&mut self, service: &TaskService, id: TaskId) -> Result<Task, AppError> {
        if self.editing.is_some() {
            return Err(AppError::EditInProgress);
        }
        let task = self.find(id).cloned().ok_or(AppError::UnknownTask(id))?;

        match service.toggle(&task).await {
            Ok(updated) => {
                self.apply_updated(updated.clone());
                Ok(updated)
            }
            Err(e) => Err(self.recover(service, e).await),
        }
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Service`] if the endpoint call fails, including
    /// `NotFound` when the task is already gone.
    pub async fn remove(&mut self, service: &TaskService, id: TaskId) -> Result<(), AppError> {
        match service.delete(&id.to_string()).await {
            Ok(deleted) => {
                self.apply_removed(deleted.id);
                Ok(())
            }
            Err(e) => Err(self.recover(service, e).await),
        }
    }

    /// Deletes every task.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::AlreadyEmpty`] if nothing is displayed, or
    /// [`AppError::Service`] (typically a bulk failure) if any delete fails.
    pub async fn clear(&mut self, service: &TaskService) -> Result<(), AppError> {
        if self.tasks.is_empty() {
            return Err(AppError::AlreadyEmpty);
        }
        match service.delete_all().await {
            Ok(_) => {
                self.apply_cleared();
                Ok(())
            }
            Err(e) => Err(self.recover(service, e).await),
        }
    }

    /// Replaces the collection with the seed set.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Service`] if either phase of the reset fails.
    pub async fn reset(&mut self, service: &TaskService) -> Result<(), AppError> {
        match service.reset().await {
            Ok(created) => {
                self.reset_form();
                self.replace_all(created);
                Ok(())
            }
            Err(e) => Err(self.recover(service, e).await),
        }
    }

    /// Re-fetches after a failed mutation, then hands the original error back.
    async fn recover(&mut self, service: &TaskService, error: ServiceError) -> AppError {
        tracing::warn!(error = %error, "mutation failed, reloading task list");
        if let Err(reload) = self.load(service).await {
            tracing::warn!(error = %reload, "reload after failure also failed");
        }
        AppError::Service(error)
    }
}
