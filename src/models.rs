// Data models for the task forest

use crate::error::StoreError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, immutable task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh unique id: `task-<uuid v7>`
    pub fn generate() -> Self {
        Self(format!("task-{}", Uuid::now_v7()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent];

    /// Sort rank: urgent first, low last
    pub fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| StoreError::unknown("priority", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Review,
    Completed,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Todo, Status::InProgress, Status::Review, Status::Completed];

    /// Sort rank: todo first, completed last
    pub fn rank(self) -> u8 {
        match self {
            Status::Todo => 0,
            Status::InProgress => 1,
            Status::Review => 2,
            Status::Completed => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in-progress",
            Status::Review => "review",
            Status::Completed => "completed",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Todo => "To Do",
            Status::InProgress => "In Progress",
            Status::Review => "Review",
            Status::Completed => "Completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| StoreError::unknown("status", s))
    }
}

/// A node in the task forest.
///
/// `subtasks` holds the ordered ids of this task's children; the forest
/// owns the child records themselves. It is rebuilt from `parent_id` on
/// load and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub color_label: Option<String>,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    #[serde(skip)]
    pub subtasks: Vec<TaskId>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub completed: bool,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default = "default_duration")]
    pub duration: u32,
}

fn default_duration() -> u32 {
    1
}

impl Task {
    /// Build a task from creation data with `created_at = updated_at = now`
    pub fn from_new(id: TaskId, data: NewTask, parent_id: Option<TaskId>, now: i64) -> Self {
        let mut task = Self {
            id,
            title: data.title,
            description: data.description,
            notes: data.notes,
            priority: data.priority,
            status: data.status,
            tags: data.tags,
            color_label: data.color_label,
            parent_id,
            subtasks: Vec::new(),
            order: data.order,
            completed: data.completed,
            created_at: now,
            updated_at: now,
            start_date: data.start_date,
            due_date: data.due_date,
            duration: data.duration.max(1),
        };
        if task.completed {
            task.status = Status::Completed;
        } else if task.status == Status::Completed {
            task.completed = true;
        }
        task
    }

    /// Flip completion; status follows the completed/todo boundary
    pub(crate) fn toggle_complete(&mut self, now: i64) -> bool {
        self.set_completed(!self.completed);
        self.touch(now);
        self.completed
    }

    fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        self.status = if completed { Status::Completed } else { Status::Todo };
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
        self.completed = status == Status::Completed;
    }

    pub(crate) fn touch(&mut self, now: i64) {
        self.updated_at = now.max(self.created_at);
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn has_subtasks(&self) -> bool {
        !self.subtasks.is_empty()
    }
}

/// Creation data for a task; everything but id, timestamps, parent and subtasks
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub notes: String,
    pub priority: Priority,
    pub status: Status,
    pub tags: Vec<String>,
    pub color_label: Option<String>,
    pub order: i64,
    pub completed: bool,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub duration: u32,
}

impl Default for NewTask {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            notes: String::new(),
            priority: Priority::default(),
            status: Status::default(),
            tags: Vec::new(),
            color_label: None,
            order: 0,
            completed: false,
            start_date: None,
            due_date: None,
            duration: 1,
        }
    }
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn color_label(mut self, color: impl Into<String>) -> Self {
        self.color_label = Some(color.into());
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn duration(mut self, days: u32) -> Self {
        self.duration = days;
        self
    }
}

/// Partial update merged into a task by `update_task`.
///
/// `None` leaves a field untouched. Optional fields use a nested `Option`
/// so they can be cleared: `Some(None)` removes the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub tags: Option<Vec<String>>,
    pub color_label: Option<Option<String>>,
    pub order: Option<i64>,
    pub completed: Option<bool>,
    pub start_date: Option<Option<NaiveDate>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub duration: Option<u32>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn color_label(mut self, color: Option<String>) -> Self {
        self.color_label = Some(color);
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    pub fn start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn due_date(mut self, date: Option<NaiveDate>) -> Self {
        self.due_date = Some(date);
        self
    }

    pub fn duration(mut self, days: u32) -> Self {
        self.duration = Some(days);
        self
    }

    /// Merge into `task` and refresh `updated_at`.
    ///
    /// When both `completed` and `status` are given, the status is kept only
    /// if it agrees with the completed flag; otherwise the flag wins.
    pub(crate) fn apply(self, task: &mut Task, now: i64) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(notes) = self.notes {
            task.notes = notes;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(tags) = self.tags {
            task.tags = tags;
        }
        if let Some(color) = self.color_label {
            task.color_label = color;
        }
        if let Some(order) = self.order {
            task.order = order;
        }
        if let Some(start) = self.start_date {
            task.start_date = start;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(duration) = self.duration {
            task.duration = duration.max(1);
        }

        match (self.completed, self.status) {
            (Some(completed), Some(status)) if completed == (status == Status::Completed) => {
                task.set_status(status);
            }
            // An unchanged flag resubmitted with a full record defers to the status
            (Some(completed), Some(status)) if completed == task.completed => task.set_status(status),
            (Some(completed), _) => task.set_completed(completed),
            (None, Some(status)) => task.set_status(status),
            (None, None) => {}
        }

        task.touch(now);
    }
}
