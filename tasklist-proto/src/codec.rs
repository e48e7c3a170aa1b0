//! JSON decoding for task payloads received across the HTTP boundary.
//!
//! Every body the client reads from the endpoint goes through these
//! functions, so a payload that does not match the [`Task`] shape surfaces
//! as a [`DecodeError`] instead of a half-filled value.
//!
//! A task must be a JSON object carrying `id`, `title` and `completed`.
//! Unknown fields are ignored.

use std::collections::HashSet;

use serde::de::Error as _;
use serde_json::Value;

use crate::task::{Task, TaskId};

/// Error type for decoding task payloads.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body is not JSON, or does not match the expected shape.
    #[error("malformed task payload: {0}")]
    Malformed(#[from] serde_json::Error),
    /// A task collection lists the same id twice.
    #[error("duplicate task id {0} in collection")]
    DuplicateId(TaskId),
}

/// Decodes a single [`Task`] from a JSON body.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] if the body is not a task object.
pub fn decode_task(bytes: &[u8]) -> Result<Task, DecodeError> {
    task_from_value(serde_json::from_slice(bytes)?)
}

/// Decodes a task collection from a JSON array body.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] if the body is not an array of tasks,
/// or [`DecodeError::DuplicateId`] if two entries share an id.
pub fn decode_task_list(bytes: &[u8]) -> Result<Vec<Task>, DecodeError> {
    let values: Vec<Value> = serde_json::from_slice(bytes)?;
    let tasks = values
        .into_iter()
        .map(task_from_value)
        .collect::<Result<Vec<_>, _>>()?;
    ensure_unique_ids(&tasks)?;
    Ok(tasks)
}

/// serde accepts a struct as a sequence too; the wire only has objects.
fn task_from_value(value: Value) -> Result<Task, DecodeError> {
    if !value.is_object() {
        return Err(serde_json::Error::custom("expected a task object").into());
    }
    Ok(serde_json::from_value(value)?)
}

/// Checks that no two tasks share an id.
///
/// # Errors
///
/// Returns [`DecodeError::DuplicateId`] naming the first repeated id.
pub fn ensure_unique_ids(tasks: &[Task]) -> Result<(), DecodeError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(DecodeError::DuplicateId(task.id));
        }
    }
    Ok(())
}
