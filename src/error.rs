// Typed failures for task store operations

use crate::models::TaskId;
use thiserror::Error;

/// Errors returned by [`TaskStore`](crate::TaskStore) and [`Forest`](crate::Forest) operations.
///
/// A failed operation never leaves the forest partially modified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Target task does not exist anywhere in the forest.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// Requested new parent does not exist.
    #[error("parent task not found: {0}")]
    ParentNotFound(TaskId),

    /// Reparenting would make a task its own ancestor.
    #[error("move would create cycle: task {task} under parent {parent}")]
    CycleDetected { task: TaskId, parent: TaskId },

    /// A priority, status or sort name that doesn't parse.
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// Loaded or constructed forest breaks a tree invariant.
    #[error("corrupt task forest: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }

    /// True when the error means the target id is absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::ParentNotFound(_))
    }
}
