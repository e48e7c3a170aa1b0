//! Task data model shared by the client and the persistence endpoint.
//!
//! A [`Task`] is identified by a [`TaskId`], a positive integer that travels
//! on the wire as a JSON string (`"7"`). Creation payloads are [`NewTask`],
//! updates are [`TaskPatch`]. Ordering is never stored; it is imposed at read
//! time with [`sort_tasks`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a string is not a valid task identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid task id {0:?}: expected a positive integer")]
pub struct ParseTaskIdError(String);

/// Unique identifier for a task: a positive integer, string-encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// The identifier handed out for the first task of an empty collection.
    pub const FIRST: Self = Self(1);

    /// Creates a `TaskId` from its numeric value. Returns `None` for zero.
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        if value == 0 { None } else { Some(Self(value)) }
    }

    /// Returns the numeric value of this identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the identifier that follows this one, or `None` past
    /// `u64::MAX`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Returns the identifier after the highest one in `ids`, or
    /// [`TaskId::FIRST`] when `ids` is empty.
    ///
    /// Returns `None` when the highest id is `u64::MAX`.
    pub fn after_max(ids: impl IntoIterator<Item = Self>) -> Option<Self> {
        ids.into_iter().max().map_or(Some(Self::FIRST), Self::next)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = ParseTaskIdError;

    /// Accepts canonical decimal only: no sign, no leading zeros, no whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical =
            !s.is_empty() && !s.starts_with('0') && s.bytes().all(|b| b.is_ascii_digit());
        if !canonical {
            return Err(ParseTaskIdError(s.to_string()));
        }
        s.parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| ParseTaskIdError(s.to_string()))
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TaskIdVisitor)
    }
}

/// Accepts `"7"` as well as a bare `7`.
struct TaskIdVisitor;

impl Visitor<'_> for TaskIdVisitor {
    type Value = TaskId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a positive integer task id, as a string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TaskId, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TaskId, E> {
        TaskId::new(v).ok_or_else(|| E::custom("task id must be positive"))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TaskId, E> {
        u64::try_from(v)
            .ok()
            .and_then(TaskId::new)
            .ok_or_else(|| E::custom("task id must be positive"))
    }
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Assigned at creation, immutable afterwards.
    pub id: TaskId,
    /// Task title.
    pub title: String,
    /// Whether the task is done.
    pub completed: bool,
}

impl Task {
    /// Builds the task a create request produces once its id is known.
    #[must_use]
    pub fn from_new(id: TaskId, new: NewTask) -> Self {
        Self {
            id,
            title: new.title,
            completed: new.completed,
        }
    }

    /// Merges the fields present in `patch` into this task.
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title.clone_from(title);
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
    }
}

/// Payload for creating a task.
///
/// When `id` is `None` the persistence endpoint assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    /// Caller-chosen id (see `TaskService::next_id`), or `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    /// Task title.
    pub title: String,
    /// Initial completion state.
    #[serde(default)]
    pub completed: bool,
}

impl NewTask {
    /// Creates an open task payload with no id.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            completed: false,
        }
    }

    /// Sets the initial completion state.
    #[must_use]
    pub const fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Pins the id instead of letting the endpoint assign one.
    #[must_use]
    pub const fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }
}

/// A partial or full set of task fields for an update.
///
/// Absent fields are omitted from the JSON body, so a PATCH only touches
/// what is set here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New completion state, if changing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// A patch that only sets the completion flag.
    #[must_use]
    pub const fn completion(completed: bool) -> Self {
        Self {
            title: None,
            completed: Some(completed),
        }
    }

    /// A patch carrying every mutable field.
    #[must_use]
    pub fn full(title: impl Into<String>, completed: bool) -> Self {
        Self {
            title: Some(title.into()),
            completed: Some(completed),
        }
    }

    /// Returns `true` if the patch sets no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none()
    }
}

/// How an update is applied at the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Full replace (HTTP `PUT`).
    #[default]
    Replace,
    /// Partial merge (HTTP `PATCH`).
    Merge,
}

/// Display order for task lists, by numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Lowest id first.
    #[default]
    Ascending,
    /// Highest id first.
    Descending,
}

impl SortOrder {
    /// Compares two ids according to this order.
    #[must_use]
    pub fn compare(self, a: TaskId, b: TaskId) -> Ordering {
        match self {
            Self::Ascending => a.cmp(&b),
            Self::Descending => b.cmp(&a),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("unknown sort order {other:?} (expected asc or desc)")),
        }
    }
}

/// Sorts tasks in place by numeric id.
pub fn sort_tasks(tasks: &mut [Task], order: SortOrder) {
    tasks.sort_unstable_by(|a, b| order.compare(a.id, b.id));
}

/// One entry of the fixed seed set used by a list reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedTask {
    /// Seed title.
    pub title: &'static str,
    /// Seed completion state.
    pub completed: bool,
}

impl SeedTask {
    /// Converts the seed entry into a create payload (endpoint-assigned id).
    #[must_use]
    pub fn to_new_task(&self) -> NewTask {
        NewTask::new(self.title).completed(self.completed)
    }
}

/// Tasks the collection is repopulated with on reset.
pub const SEED_TASKS: &[SeedTask] = &[
    SeedTask {
        title: "Read the project README",
        completed: true,
    },
    SeedTask {
        title: "Start the JSON server",
        completed: true,
    },
    SeedTask {
        title: "Add a new task",
        completed: false,
    },
    SeedTask {
        title: "Mark a task as completed",
        completed: false,
    },
    SeedTask {
        title: "Clear the task list",
        completed: false,
    },
];

/// Returns the default seed set as create payloads.
#[must_use]
pub fn seed_tasks() -> Vec<NewTask> {
    SEED_TASKS.iter().map(SeedTask::to_new_task).collect()
}
