//! Plain-text rendering of the task list.
//!
//! Every function returns a `String`; callers decide where it goes.

use std::fmt::Write as _;

use tasklist_proto::task::Task;

use crate::app::{App, AppError};
use crate::service::ServiceError;

/// Application header line, e.g. `Tasklist v0.1.0`.
#[must_use]
pub fn render_header(app_name: &str, version: &str) -> String {
    format!("{app_name} v{version}")
}

/// One task line: `[x] 3 - Buy milk`.
#[must_use]
pub fn render_task(task: &Task, editing: bool) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    let mut line = format!("[{mark}] {} - {}", task.id, task.title);
    if editing {
        line.push_str("  (editing)");
    }
    line
}

/// The whole list followed by the task counter.
#[must_use]
pub fn render_list(app: &App) -> String {
    let mut out = String::new();
    if app.tasks().is_empty() {
        out.push_str("Empty list\n");
    }
    for task in app.tasks() {
        let editing = app.editing() == Some(task.id);
        let _ = writeln!(out, "{}", render_task(task, editing));
    }
    let _ = write!(out, "Total: {}", app.tasks().len());
    out
}

/// An error message, listing each failed item of a bulk failure.
#[must_use]
pub fn render_error(error: &AppError) -> String {
    let mut out = format!("Error: {error}");
    if let AppError::Service(ServiceError::Bulk(bulk)) = error {
        for failure in &bulk.failures {
            let _ = write!(out, "\n  - {}: {}", failure.target, failure.error);
        }
    }
    out
}
