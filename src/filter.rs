// List-view filtering and sorting over the task tree

use crate::error::StoreError;
use crate::forest::TaskTree;
use crate::models::{Priority, Status, Task};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Filter for the list view.
///
/// Empty criteria match everything; all non-empty criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Case-insensitive substring of the title
    pub search: Option<String>,
    /// Allowed statuses
    pub statuses: Vec<Status>,
    /// Allowed priorities
    pub priorities: Vec<Priority>,
    /// Task must carry at least one of these tags
    pub tags: Vec<String>,
    /// Inclusive due-date bounds; undated tasks never match a set bound
    pub due_from: Option<NaiveDate>,
    pub due_until: Option<NaiveDate>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.search = if query.trim().is_empty() { None } else { Some(query) };
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priorities.push(priority);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn due_between(mut self, from: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        self.due_from = from;
        self.due_until = until;
        self
    }

    /// Whether a single task passes, ignoring its subtasks
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(query) = &self.search
            && !task.title.to_lowercase().contains(&query.to_lowercase())
        {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if !self.tags.is_empty() && !task.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if self.due_from.is_some() || self.due_until.is_some() {
            let Some(due) = task.due_date else {
                return false;
            };
            if self.due_from.is_some_and(|from| due < from) || self.due_until.is_some_and(|until| due > until) {
                return false;
            }
        }
        true
    }
}

/// Sort key for the list view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    /// Due date ascending, undated last
    DueDate,
    /// Urgent first
    Priority,
    /// Todo first
    Status,
    /// Newest first
    CreatedAt,
    /// `order` ascending
    #[default]
    Custom,
}

impl SortOption {
    pub const ALL: [SortOption; 5] = [
        SortOption::DueDate,
        SortOption::Priority,
        SortOption::Status,
        SortOption::CreatedAt,
        SortOption::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOption::DueDate => "due-date",
            SortOption::Priority => "priority",
            SortOption::Status => "status",
            SortOption::CreatedAt => "created-at",
            SortOption::Custom => "custom",
        }
    }

    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortOption::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortOption::Priority => a.priority.rank().cmp(&b.priority.rank()),
            SortOption::Status => a.status.rank().cmp(&b.status.rank()),
            SortOption::CreatedAt => b.created_at.cmp(&a.created_at),
            SortOption::Custom => a.order.cmp(&b.order),
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        SortOption::ALL
            .into_iter()
            .find(|opt| opt.as_str().replace('-', "") == normalized)
            .ok_or_else(|| StoreError::unknown("sort option", s))
    }
}

/// Keep the nodes that pass `filter`, applying it independently at every level.
///
/// A node that fails is dropped with its whole subtree, even if a descendant
/// would match. A node that passes keeps only its passing children.
pub fn filter_tree(trees: Vec<TaskTree>, filter: &TaskFilter) -> Vec<TaskTree> {
    if filter.is_empty() {
        return trees;
    }
    trees
        .into_iter()
        .filter(|node| filter.matches(&node.task))
        .map(|node| TaskTree {
            task: node.task,
            subtasks: filter_tree(node.subtasks, filter),
        })
        .collect()
}

/// Stable sort of every sibling list in the tree
pub fn sort_tree(trees: &mut [TaskTree], sort: SortOption) {
    trees.sort_by(|a, b| sort.compare(&a.task, &b.task));
    for node in trees.iter_mut() {
        sort_tree(&mut node.subtasks, sort);
    }
}
