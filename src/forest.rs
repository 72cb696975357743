// Arena-backed task forest and the read queries every view shares

use crate::error::StoreError;
use crate::models::{Status, Task, TaskId};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Padding added on both sides of the gantt timeline
pub const TIMELINE_PADDING_DAYS: u64 = 7;

/// Ordered forest of tasks.
///
/// Tasks live in an arena keyed by id; each task's `subtasks` lists its
/// children in order and `roots` lists the top-level tasks. Tasks sit behind
/// `Arc` so clones of the forest share every task they don't modify.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    tasks: HashMap<TaskId, Arc<Task>>,
    roots: Vec<TaskId>,
}

/// A task with its subtasks materialized, as the list view renders it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskTree {
    #[serde(flatten)]
    pub task: Task,
    pub subtasks: Vec<TaskTree>,
}

impl TaskTree {
    /// Number of nodes in this subtree, including the root
    pub fn node_count(&self) -> usize {
        1 + self.subtasks.iter().map(TaskTree::node_count).sum::<usize>()
    }

    /// Pre-order ids of this subtree
    pub fn ids(&self) -> Vec<&TaskId> {
        let mut out = Vec::with_capacity(self.node_count());
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a TaskId>) {
        out.push(&self.task.id);
        for child in &self.subtasks {
            child.collect_ids(out);
        }
    }
}

/// Date span covered by the gantt chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Inclusive day count from `start` to `end`
    pub total_days: i64,
}

impl Timeline {
    /// Every day from `start` to `end`, inclusive
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    /// Gantt bar of a task: day offset of its start from `start` and its
    /// length in days (`duration`, at least 1). `None` without a start date.
    pub fn bar(&self, task: &Task) -> Option<(i64, i64)> {
        let start = task.start_date?;
        Some(((start - self.start).num_days(), i64::from(task.duration.max(1))))
    }
}

/// Pre-order iterator: node, then each child's subtree in order
pub struct PreOrder<'a> {
    forest: &'a Forest,
    stack: Vec<&'a TaskId>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a Task;

    fn next(&mut self) -> Option<Self::Item> {
        let forest = self.forest;
        while let Some(id) = self.stack.pop() {
            if let Some(task) = forest.tasks.get(id) {
                self.stack.extend(task.subtasks.iter().rev());
                return Some(task.as_ref());
            }
        }
        None
    }
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest from flat task records.
    ///
    /// Hierarchy comes from each record's `parent_id`; siblings keep the
    /// order in which they appear. Any `subtasks` already on the records are
    /// ignored. Duplicate ids, dangling parents and cycles are rejected.
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Result<Self, StoreError> {
        let mut forest = Forest::default();
        let mut order = Vec::new();

        for mut task in tasks {
            task.subtasks.clear();
            if forest.tasks.contains_key(&task.id) {
                return Err(StoreError::Corrupt(format!("duplicate task id {}", task.id)));
            }
            order.push(task.id.clone());
            forest.tasks.insert(task.id.clone(), Arc::new(task));
        }

        for id in &order {
            let parent_id = forest.tasks[id].parent_id.clone();
            match parent_id {
                None => forest.roots.push(id.clone()),
                Some(parent_id) => {
                    let parent = forest.tasks.get_mut(&parent_id).ok_or_else(|| {
                        StoreError::Corrupt(format!("task {} references missing parent {}", id, parent_id))
                    })?;
                    Arc::make_mut(parent).subtasks.push(id.clone());
                }
            }
        }

        forest.validate()?;
        Ok(forest)
    }

    /// Total number of tasks at every depth
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Look up a task anywhere in the forest
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id).map(Arc::as_ref)
    }

    pub fn root_ids(&self) -> &[TaskId] {
        &self.roots
    }

    pub fn roots(&self) -> impl Iterator<Item = &Task> + '_ {
        self.roots.iter().filter_map(|id| self.get(id.as_str()))
    }

    /// Direct children of `id`, in order; empty when `id` is unknown
    pub fn children(&self, id: &str) -> Vec<&Task> {
        self.get(id)
            .map(|task| task.subtasks.iter().filter_map(|c| self.get(c.as_str())).collect())
            .unwrap_or_default()
    }

    /// Pre-order traversal of the whole forest
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            forest: self,
            stack: self.roots.iter().rev().collect(),
        }
    }

    /// Full pre-order flattening: parents before children, siblings in order
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.iter().collect()
    }

    /// Pre-order traversal of the subtree rooted at `id`, including `id`
    fn subtree_iter(&self, id: &str) -> PreOrder<'_> {
        let stack = self.tasks.get(id).map(|task| vec![&task.id]).unwrap_or_default();
        PreOrder { forest: self, stack }
    }

    /// Every task below `id`, in pre-order
    pub fn descendants(&self, id: &str) -> Vec<&Task> {
        self.subtree_iter(id).skip(1).collect()
    }

    /// Ids of `id` and everything below it, in pre-order
    pub fn subtree_ids(&self, id: &str) -> Vec<TaskId> {
        self.subtree_iter(id).map(|task| task.id.clone()).collect()
    }

    /// Parent chain of `id`, nearest first
    pub fn ancestors(&self, id: &str) -> Vec<&Task> {
        let mut out = Vec::new();
        let mut cursor = self.get(id).and_then(|task| task.parent_id.as_ref());
        while let Some(parent_id) = cursor {
            // A well-formed forest never revisits a node
            if out.len() >= self.tasks.len() {
                break;
            }
            match self.get(parent_id.as_str()) {
                Some(parent) => {
                    out.push(parent);
                    cursor = parent.parent_id.as_ref();
                }
                None => break,
            }
        }
        out
    }

    /// Nesting depth; roots are at depth 0
    pub fn depth(&self, id: &str) -> Option<usize> {
        self.get(id).map(|_| self.ancestors(id).len())
    }

    /// True when `ancestor` is `id` itself or lies on its parent chain
    pub fn is_self_or_ancestor(&self, ancestor: &str, id: &str) -> bool {
        ancestor == id || self.ancestors(id).iter().any(|t| t.id.as_str() == ancestor)
    }

    /// Materialize the nested forest
    pub fn tree(&self) -> Vec<TaskTree> {
        self.roots.iter().filter_map(|id| self.subtree(id.as_str())).collect()
    }

    /// Materialize the subtree rooted at `id`
    pub fn subtree(&self, id: &str) -> Option<TaskTree> {
        let task = self.get(id)?;
        Some(TaskTree {
            task: task.clone(),
            subtasks: task.subtasks.iter().filter_map(|c| self.subtree(c.as_str())).collect(),
        })
    }

    // ========================================================================
    // Derived queries
    // ========================================================================

    /// Incomplete tasks due on `today`
    pub fn today_tasks(&self, today: NaiveDate) -> Vec<&Task> {
        self.iter()
            .filter(|task| !task.completed && task.due_date == Some(today))
            .collect()
    }

    /// Incomplete tasks due strictly before `today`
    pub fn overdue_tasks(&self, today: NaiveDate) -> Vec<&Task> {
        self.iter()
            .filter(|task| !task.completed && task.due_date.is_some_and(|due| due < today))
            .collect()
    }

    /// Tasks due on `date`, completed or not
    pub fn due_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.iter().filter(|task| task.due_date == Some(date)).collect()
    }

    /// Tasks with both a start and a due date
    pub fn scheduled(&self) -> Vec<&Task> {
        self.iter()
            .filter(|task| task.start_date.is_some() && task.due_date.is_some())
            .collect()
    }

    /// Padded span covering every scheduled task's start and due dates
    pub fn timeline(&self) -> Option<Timeline> {
        let dates = self
            .scheduled()
            .into_iter()
            .flat_map(|task| [task.start_date, task.due_date])
            .flatten();

        let (min, max) = dates.fold(None, |acc: Option<(NaiveDate, NaiveDate)>, d| match acc {
            None => Some((d, d)),
            Some((lo, hi)) => Some((lo.min(d), hi.max(d))),
        })?;

        let start = min.checked_sub_days(Days::new(TIMELINE_PADDING_DAYS))?;
        let end = max.checked_add_days(Days::new(TIMELINE_PADDING_DAYS))?;
        Some(Timeline {
            start,
            end,
            total_days: (end - start).num_days() + 1,
        })
    }

    /// Kanban columns: every status in order with its tasks in pre-order
    pub fn by_status(&self) -> Vec<(Status, Vec<&Task>)> {
        Status::ALL
            .into_iter()
            .map(|status| (status, self.iter().filter(|t| t.status == status).collect()))
            .collect()
    }

    /// Check the tree invariants, reporting the first violation
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&TaskId, Option<&TaskId>)> = self.roots.iter().rev().map(|id| (id, None)).collect();

        while let Some((id, expected_parent)) = stack.pop() {
            let task = self
                .tasks
                .get(id)
                .ok_or_else(|| StoreError::Corrupt(format!("dangling reference to {}", id)))?;

            if !seen.insert(id.as_str()) {
                return Err(StoreError::Corrupt(format!("task {} appears more than once", id)));
            }
            if task.parent_id.as_ref() != expected_parent {
                return Err(StoreError::Corrupt(format!(
                    "task {} has parent_id {:?} but sits under {:?}",
                    id,
                    task.parent_id.as_ref().map(TaskId::as_str),
                    expected_parent.map(TaskId::as_str)
                )));
            }
            if task.completed != (task.status == Status::Completed) {
                return Err(StoreError::Corrupt(format!(
                    "task {} has completed={} but status {}",
                    id, task.completed, task.status
                )));
            }
            if task.updated_at < task.created_at {
                return Err(StoreError::Corrupt(format!("task {} updated before it was created", id)));
            }

            stack.extend(task.subtasks.iter().rev().map(|child| (child, Some(id))));
        }

        if seen.len() != self.tasks.len() {
            return Err(StoreError::Corrupt(format!(
                "{} tasks are unreachable from the roots",
                self.tasks.len() - seen.len()
            )));
        }

        Ok(())
    }

    // ========================================================================
    // Mutation primitives (callers check preconditions)
    // ========================================================================

    /// Attach a new task under its `parent_id`, or as a root
    pub(crate) fn insert(&mut self, task: Task) -> TaskId {
        let id = task.id.clone();
        match task.parent_id.clone() {
            Some(parent_id) => {
                if let Some(parent) = self.tasks.get_mut(&parent_id) {
                    Arc::make_mut(parent).subtasks.push(id.clone());
                }
            }
            None => self.roots.push(id.clone()),
        }
        self.tasks.insert(id.clone(), Arc::new(task));
        id
    }

    /// Mutable access to one task; copies it first if a snapshot shares it
    pub(crate) fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.get_mut(id).map(Arc::make_mut)
    }

    /// Unlink `id` from its parent's child list or from the roots
    fn detach(&mut self, id: &str) {
        let parent_id = self.get(id).and_then(|task| task.parent_id.clone());
        match parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.task_mut(parent_id.as_str()) {
                    parent.subtasks.retain(|child| child.as_str() != id);
                }
            }
            None => self.roots.retain(|root| root.as_str() != id),
        }
    }

    /// Remove `id` and its whole subtree, returning the removed ids in pre-order
    pub(crate) fn remove_subtree(&mut self, id: &str) -> Vec<TaskId> {
        let removed = self.subtree_ids(id);
        if removed.is_empty() {
            return removed;
        }
        self.detach(id);
        for task_id in &removed {
            self.tasks.remove(task_id);
        }
        removed
    }

    /// Move `id` under `new_parent` (or to the roots), appended last
    pub(crate) fn reparent(&mut self, id: &str, new_parent: Option<TaskId>, order: i64, now: i64) {
        self.detach(id);

        let Some(task) = self.task_mut(id) else {
            return;
        };
        task.parent_id = new_parent.clone();
        task.order = order;
        task.touch(now);
        let id = task.id.clone();

        match new_parent {
            Some(parent_id) => {
                if let Some(parent) = self.task_mut(parent_id.as_str()) {
                    parent.subtasks.push(id);
                }
            }
            None => self.roots.push(id),
        }
    }
}
