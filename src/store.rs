// Task store: owns the forest, applies mutations, publishes snapshots

use crate::clock::{Clock, SystemClock};
use crate::error::StoreError;
use crate::filter::{SortOption, TaskFilter, filter_tree, sort_tree};
use crate::forest::{Forest, TaskTree};
use crate::jsonl;
use crate::models::{NewTask, Task, TaskId, TaskUpdate};
use crate::stats::{self, DashboardStats};
use eyre::{Context, Result};
use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Immutable view of the forest at one revision.
///
/// Cheap to clone. Later mutations of the store never show through a
/// snapshot that is already held.
#[derive(Debug, Clone)]
pub struct Snapshot {
    revision: u64,
    forest: Arc<Forest>,
}

impl Snapshot {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn forest(&self) -> &Forest {
        &self.forest
    }
}

impl Deref for Snapshot {
    type Target = Forest;

    fn deref(&self) -> &Forest {
        &self.forest
    }
}

/// Handle returned by [`TaskStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&Snapshot) + Send>;

/// The canonical task forest and the operations every view uses.
///
/// Every successful mutation bumps the revision and hands a fresh
/// [`Snapshot`] to each subscriber. Failed mutations change nothing and
/// notify no one.
pub struct TaskStore {
    forest: Arc<Forest>,
    revision: u64,
    filter: TaskFilter,
    sort: SortOption,
    clock: Box<dyn Clock>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.forest.len())
            .field("revision", &self.revision)
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl TaskStore {
    /// Empty store on the system clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self::from_forest(Forest::new(), clock)
    }

    pub fn from_forest(forest: Forest, clock: impl Clock + 'static) -> Self {
        Self {
            forest: Arc::new(forest),
            revision: 0,
            filter: TaskFilter::default(),
            sort: SortOption::default(),
            clock: Box::new(clock),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Build a store from flat task records (see [`Forest::from_tasks`])
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>, clock: impl Clock + 'static) -> Result<Self, StoreError> {
        Ok(Self::from_forest(Forest::from_tasks(tasks)?, clock))
    }

    // ========================================================================
    // Persistence boundary
    // ========================================================================

    /// Load a JSONL snapshot; a missing file yields an empty store
    pub fn load<P: AsRef<Path>>(path: P, clock: impl Clock + 'static) -> Result<Self> {
        let path = path.as_ref();
        let records: Vec<Task> = jsonl::read_jsonl_latest(path)?;
        let store = Self::from_tasks(records, clock).with_context(|| format!("Failed to load tasks from {:?}", path))?;
        info!(file = ?path, tasks = store.forest.len(), "Loaded task forest");
        Ok(store)
    }

    /// Write the whole forest as JSONL, one task per line in pre-order
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let count = jsonl::write_jsonl(path, self.forest.iter())
            .with_context(|| format!("Failed to save tasks to {:?}", path))?;
        info!(file = ?path, tasks = count, revision = self.revision, "Saved task forest");
        Ok(())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a root-level task, appended after the existing roots
    pub fn add_task(&mut self, data: NewTask) -> TaskId {
        let task = Task::from_new(TaskId::generate(), data, None, self.clock.now_ms());
        let id = self.forest_mut().insert(task);
        self.commit("add_task", id.as_str());
        id
    }

    /// Create a task as the last child of `parent_id`, at any depth
    pub fn add_subtask(&mut self, parent_id: &str, data: NewTask) -> Result<TaskId, StoreError> {
        let parent = self.require(parent_id)?.id.clone();
        let task = Task::from_new(TaskId::generate(), data, Some(parent), self.clock.now_ms());
        let id = self.forest_mut().insert(task);
        self.commit("add_subtask", id.as_str());
        Ok(id)
    }

    /// Merge `updates` into one task and refresh its `updated_at`
    pub fn update_task(&mut self, id: &str, updates: TaskUpdate) -> Result<(), StoreError> {
        self.require(id)?;
        let now = self.clock.now_ms();
        if let Some(task) = self.forest_mut().task_mut(id) {
            updates.apply(task, now);
        }
        self.commit("update_task", id);
        Ok(())
    }

    /// Delete a task and its whole subtree, returning the removed ids
    pub fn delete_task(&mut self, id: &str) -> Result<Vec<TaskId>, StoreError> {
        self.require(id)?;
        let removed = self.forest_mut().remove_subtree(id);
        debug!(id, removed = removed.len(), "delete_task: removed subtree");
        self.commit("delete_task", id);
        Ok(removed)
    }

    /// Flip completion of one task, returning the new `completed` value.
    ///
    /// Does not cascade to subtasks.
    pub fn toggle_task_complete(&mut self, id: &str) -> Result<bool, StoreError> {
        self.require(id)?;
        let now = self.clock.now_ms();
        let completed = self
            .forest_mut()
            .task_mut(id)
            .map(|task| task.toggle_complete(now))
            .unwrap_or_default();
        self.commit("toggle_task_complete", id);
        Ok(completed)
    }

    /// Reattach a task (with its subtree) under `new_parent_id`, or as a root.
    ///
    /// The task is appended after its new siblings with `order = new_order`.
    /// Moving a task under itself or one of its descendants is rejected.
    pub fn move_task(&mut self, id: &str, new_parent_id: Option<&str>, new_order: i64) -> Result<(), StoreError> {
        let task_id = self.require(id)?.id.clone();

        let new_parent = match new_parent_id {
            Some(parent_id) => {
                let parent = self
                    .forest
                    .get(parent_id)
                    .ok_or_else(|| StoreError::ParentNotFound(TaskId::from(parent_id)))?;
                if self.forest.is_self_or_ancestor(id, parent_id) {
                    return Err(StoreError::CycleDetected {
                        task: task_id,
                        parent: parent.id.clone(),
                    });
                }
                Some(parent.id.clone())
            }
            None => None,
        };

        let now = self.clock.now_ms();
        self.forest_mut().reparent(id, new_parent, new_order, now);
        self.commit("move_task", id);
        Ok(())
    }

    /// Swap the whole forest for `tasks`, returning how many were loaded.
    ///
    /// On error the current forest is left untouched.
    pub fn replace_all(&mut self, tasks: impl IntoIterator<Item = Task>) -> Result<usize, StoreError> {
        let forest = Forest::from_tasks(tasks)?;
        let count = forest.len();
        self.forest = Arc::new(forest);
        self.commit("replace_all", "*");
        Ok(count)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The current forest
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.forest.get(id)
    }

    /// Pre-order flattening of every task at every depth
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.forest.all_tasks()
    }

    /// Incomplete tasks due today by the store's clock
    pub fn today_tasks(&self) -> Vec<&Task> {
        self.forest.today_tasks(self.clock.today())
    }

    /// Incomplete tasks due before today by the store's clock
    pub fn overdue_tasks(&self) -> Vec<&Task> {
        self.forest.overdue_tasks(self.clock.today())
    }

    pub fn dashboard(&self) -> DashboardStats {
        stats::dashboard(&self.forest, self.clock.today())
    }

    /// The nested forest with the active filter and sort applied
    pub fn list_view(&self) -> Vec<TaskTree> {
        let mut trees = filter_tree(self.forest.tree(), &self.filter);
        sort_tree(&mut trees, self.sort);
        trees
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    pub fn sort_option(&self) -> SortOption {
        self.sort
    }

    pub fn set_sort_option(&mut self, sort: SortOption) {
        self.sort = sort;
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a callback run with a fresh snapshot after each mutation
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false when `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            revision: self.revision,
            forest: Arc::clone(&self.forest),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn require(&self, id: &str) -> Result<&Task, StoreError> {
        self.forest.get(id).ok_or_else(|| StoreError::NotFound(TaskId::from(id)))
    }

    /// Copy-on-write access; clones the arena only while a snapshot holds it
    fn forest_mut(&mut self) -> &mut Forest {
        Arc::make_mut(&mut self.forest)
    }

    fn commit(&mut self, op: &'static str, id: &str) {
        self.revision += 1;
        debug!(op, id, revision = self.revision, "Committed mutation");

        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::{Priority, Status};
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const DAY: i64 = 86_400_000;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn test_store() -> (TaskStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::on(today()));
        (TaskStore::with_clock(Arc::clone(&clock)), clock)
    }

    /// Every parent_id matches the actual parent and nothing is its own ancestor
    fn assert_well_formed(store: &TaskStore) {
        store.forest().validate().unwrap();
        for task in store.all_tasks() {
            let actual_parent = store
                .all_tasks()
                .into_iter()
                .find(|p| p.subtasks.contains(&task.id))
                .map(|p| p.id.clone());
            assert_eq!(task.parent_id, actual_parent);
            assert!(
                store
                    .forest()
                    .ancestors(task.id.as_str())
                    .iter()
                    .all(|a| a.id != task.id)
            );
        }
    }

    #[test]
    fn test_add_task_appends_root() {
        let (mut store, clock) = test_store();

        let first = store.add_task(NewTask::new("First"));
        clock.advance(10);
        let second = store.add_task(NewTask::new("Second").priority(Priority::High));

        assert_eq!(store.forest().root_ids(), &[first.clone(), second.clone()]);
        let task = store.get_task(second.as_str()).unwrap();
        assert_eq!(task.title, "Second");
        assert_eq!(task.created_at, task.updated_at);
        assert_eq!(task.created_at, clock.now_ms());
        assert!(task.parent_id.is_none());
        assert!(task.subtasks.is_empty());
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_add_subtask_at_depth() {
        let (mut store, _) = test_store();
        let root = store.add_task(NewTask::new("Root"));
        let child = store.add_subtask(root.as_str(), NewTask::new("Child")).unwrap();
        let grandchild = store.add_subtask(child.as_str(), NewTask::new("Grandchild")).unwrap();

        assert_eq!(store.get_task(grandchild.as_str()).unwrap().parent_id, Some(child.clone()));
        assert_eq!(store.get_task(root.as_str()).unwrap().subtasks, vec![child]);
        assert_well_formed(&store);
    }

    #[test]
    fn test_add_subtask_missing_parent() {
        let (mut store, _) = test_store();
        store.add_task(NewTask::new("Root"));

        let err = store.add_subtask("nope", NewTask::new("Orphan")).unwrap_err();
        assert_eq!(err, StoreError::NotFound(TaskId::from("nope")));
        assert_eq!(store.all_tasks().len(), 1);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_update_task_touches_only_target() {
        let (mut store, clock) = test_store();
        let root = store.add_task(NewTask::new("Root"));
        let child = store.add_subtask(root.as_str(), NewTask::new("Child")).unwrap();
        let root_updated = store.get_task(root.as_str()).unwrap().updated_at;

        clock.advance(DAY);
        store
            .update_task(child.as_str(), TaskUpdate::default().title("Renamed").status(Status::Review))
            .unwrap();

        let updated = store.get_task(child.as_str()).unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.status, Status::Review);
        assert_eq!(updated.updated_at, clock.now_ms());
        assert!(updated.updated_at >= updated.created_at);
        // Parent is not refreshed by a descendant change
        assert_eq!(store.get_task(root.as_str()).unwrap().updated_at, root_updated);
        assert_eq!(store.get_task(root.as_str()).unwrap().subtasks, vec![child]);
    }

    #[test]
    fn test_update_task_missing_id() {
        let (mut store, _) = test_store();
        let result = store.update_task("ghost", TaskUpdate::default().title("x"));
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_delete_cascades() {
        let (mut store, _) = test_store();
        let root = store.add_task(NewTask::new("Root"));
        let keep = store.add_task(NewTask::new("Keep"));
        let child = store.add_subtask(root.as_str(), NewTask::new("Child")).unwrap();
        store.add_subtask(child.as_str(), NewTask::new("Grandchild")).unwrap();
        store.add_subtask(root.as_str(), NewTask::new("Child 2")).unwrap();

        let descendants = store.forest().descendants(root.as_str()).len();
        let before = store.all_tasks().len();

        let removed = store.delete_task(root.as_str()).unwrap();
        assert_eq!(removed.len(), descendants + 1);
        assert_eq!(store.all_tasks().len(), before - (descendants + 1));
        assert!(store.get_task(root.as_str()).is_none());
        assert!(store.get_task(child.as_str()).is_none());
        assert!(store.get_task(keep.as_str()).is_some());
        assert_well_formed(&store);

        assert!(store.delete_task(root.as_str()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_nested_task_only() {
        let (mut store, _) = test_store();
        let root = store.add_task(NewTask::new("Root"));
        let a = store.add_subtask(root.as_str(), NewTask::new("A")).unwrap();
        let b = store.add_subtask(root.as_str(), NewTask::new("B")).unwrap();

        store.delete_task(a.as_str()).unwrap();
        assert_eq!(store.get_task(root.as_str()).unwrap().subtasks, vec![b]);
        assert_well_formed(&store);
    }

    #[test]
    fn test_toggle_round_trip() {
        let (mut store, _) = test_store();
        let id = store
            .add_task(NewTask::new("Review").status(Status::InProgress))
            .to_string();

        assert!(store.toggle_task_complete(&id).unwrap());
        let task = store.get_task(&id).unwrap();
        assert!(task.completed);
        assert_eq!(task.status, Status::Completed);

        assert!(!store.toggle_task_complete(&id).unwrap());
        let task = store.get_task(&id).unwrap();
        assert!(!task.completed);
        assert_eq!(task.status, Status::Todo);

        // From todo the round trip is exact
        store.toggle_task_complete(&id).unwrap();
        store.toggle_task_complete(&id).unwrap();
        let task = store.get_task(&id).unwrap();
        assert!(!task.completed);
        assert_eq!(task.status, Status::Todo);
    }

    #[test]
    fn test_toggle_does_not_cascade() {
        let (mut store, _) = test_store();
        let root = store.add_task(NewTask::new("Root"));
        let child = store.add_subtask(root.as_str(), NewTask::new("Child")).unwrap();

        store.toggle_task_complete(root.as_str()).unwrap();
        assert!(store.get_task(root.as_str()).unwrap().completed);
        assert!(!store.get_task(child.as_str()).unwrap().completed);

        assert!(store.toggle_task_complete("missing").is_err());
    }

    #[test]
    fn test_today_scenario() {
        let (mut store, _) = test_store();
        let t1 = store.add_task(NewTask::new("T1").due_date(today()));

        assert!(store.today_tasks().iter().any(|t| t.id == t1));
        store.toggle_task_complete(t1.as_str()).unwrap();
        assert!(!store.today_tasks().iter().any(|t| t.id == t1));
    }

    #[test]
    fn test_today_and_overdue_follow_clock() {
        let (mut store, clock) = test_store();
        let t1 = store.add_task(NewTask::new("T1").due_date(today()));
        store.add_task(NewTask::new("Undated"));

        assert_eq!(store.today_tasks().len(), 1);
        assert!(store.overdue_tasks().is_empty());

        clock.advance_days(1);
        assert!(store.today_tasks().is_empty());
        assert_eq!(store.overdue_tasks()[0].id, t1);
    }

    #[test]
    fn test_delete_scenario() {
        let (mut store, _) = test_store();
        let t1 = store.add_task(NewTask::new("T1"));
        let t2 = store.add_subtask(t1.as_str(), NewTask::new("T2")).unwrap();

        store.delete_task(t1.as_str()).unwrap();
        let all = store.all_tasks();
        assert!(all.iter().all(|t| t.id != t1 && t.id != t2));
    }

    #[test]
    fn test_move_to_root_scenario() {
        let (mut store, clock) = test_store();
        let t1 = store.add_task(NewTask::new("T1"));
        let t2 = store.add_subtask(t1.as_str(), NewTask::new("T2")).unwrap();

        clock.advance(5);
        store.move_task(t2.as_str(), None, 0).unwrap();

        let moved = store.get_task(t2.as_str()).unwrap();
        assert!(moved.parent_id.is_none());
        assert_eq!(moved.order, 0);
        assert_eq!(moved.updated_at, clock.now_ms());
        assert!(store.get_task(t1.as_str()).unwrap().subtasks.is_empty());
        assert_eq!(store.forest().root_ids(), &[t1, t2]);
        assert_well_formed(&store);
    }

    #[test]
    fn test_move_carries_subtree() {
        let (mut store, _) = test_store();
        let a = store.add_task(NewTask::new("A"));
        let b = store.add_task(NewTask::new("B"));
        let a1 = store.add_subtask(a.as_str(), NewTask::new("A1")).unwrap();
        let a1x = store.add_subtask(a1.as_str(), NewTask::new("A1x")).unwrap();

        store.move_task(a1.as_str(), Some(b.as_str()), 3).unwrap();

        assert_eq!(store.forest().depth(a1x.as_str()), Some(2));
        assert_eq!(store.get_task(a1.as_str()).unwrap().parent_id, Some(b.clone()));
        assert_eq!(store.get_task(a1.as_str()).unwrap().order, 3);
        assert_eq!(store.get_task(b.as_str()).unwrap().subtasks, vec![a1]);
        assert_well_formed(&store);
    }

    #[test]
    fn test_move_rejects_cycles() {
        let (mut store, _) = test_store();
        let a = store.add_task(NewTask::new("A"));
        let child = store.add_subtask(a.as_str(), NewTask::new("Child")).unwrap();
        let grandchild = store.add_subtask(child.as_str(), NewTask::new("Grandchild")).unwrap();
        let revision = store.revision();

        let err = store.move_task(a.as_str(), Some(a.as_str()), 0).unwrap_err();
        assert!(matches!(err, StoreError::CycleDetected { .. }));

        let err = store.move_task(a.as_str(), Some(grandchild.as_str()), 0).unwrap_err();
        assert_eq!(
            err,
            StoreError::CycleDetected {
                task: a.clone(),
                parent: grandchild.clone()
            }
        );

        // Rejected moves leave the forest alone
        assert_eq!(store.revision(), revision);
        assert_eq!(store.forest().root_ids(), &[a]);
        assert_well_formed(&store);
    }

    #[test]
    fn test_move_missing_ids() {
        let (mut store, _) = test_store();
        let a = store.add_task(NewTask::new("A"));

        assert_eq!(
            store.move_task("ghost", None, 0).unwrap_err(),
            StoreError::NotFound(TaskId::from("ghost"))
        );
        assert_eq!(
            store.move_task(a.as_str(), Some("ghost"), 0).unwrap_err(),
            StoreError::ParentNotFound(TaskId::from("ghost"))
        );
    }

    #[test]
    fn test_random_operation_sequence_stays_well_formed() {
        let (mut store, _) = test_store();
        let mut ids: Vec<TaskId> = Vec::new();

        // Deterministic pseudo-random walk over add/subtask/move/delete
        let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
        let mut next = move |bound: usize| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed % bound as u64) as usize
        };

        for step in 0..300 {
            match next(4) {
                0 => ids.push(store.add_task(NewTask::new(format!("root {step}")))),
                1 if !ids.is_empty() => {
                    let parent = ids[next(ids.len())].clone();
                    ids.push(store.add_subtask(parent.as_str(), NewTask::new(format!("sub {step}"))).unwrap());
                }
                2 if !ids.is_empty() => {
                    let id = ids[next(ids.len())].clone();
                    let parent = if next(3) == 0 {
                        None
                    } else {
                        Some(ids[next(ids.len())].clone())
                    };
                    match store.move_task(id.as_str(), parent.as_ref().map(TaskId::as_str), step) {
                        Ok(()) | Err(StoreError::CycleDetected { .. }) => {}
                        Err(e) => panic!("unexpected move error: {e}"),
                    }
                }
                3 if ids.len() > 5 => {
                    let id = ids[next(ids.len())].clone();
                    let removed = store.delete_task(id.as_str()).unwrap();
                    ids.retain(|i| !removed.contains(i));
                }
                _ => {}
            }
            assert_eq!(store.all_tasks().len(), ids.len());
        }

        assert_well_formed(&store);
        let total: usize = store.forest().tree().iter().map(TaskTree::node_count).sum();
        assert_eq!(store.all_tasks().len(), total);
    }

    #[test]
    fn test_subscribers_get_each_mutation() {
        let (mut store, _) = test_store();
        let seen: Arc<Mutex<Vec<(u64, usize)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let sub = store.subscribe(move |snap| sink.lock().unwrap().push((snap.revision(), snap.len())));

        let a = store.add_task(NewTask::new("A"));
        store.add_subtask(a.as_str(), NewTask::new("B")).unwrap();
        // Failed mutation publishes nothing
        let _ = store.toggle_task_complete("missing");
        store.delete_task(a.as_str()).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 1), (2, 2), (3, 0)]);

        assert!(store.unsubscribe(sub));
        assert!(!store.unsubscribe(sub));
        store.add_task(NewTask::new("C"));
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_snapshot_is_immutable() {
        let (mut store, _) = test_store();
        let a = store.add_task(NewTask::new("A"));
        let snapshot = store.snapshot();

        store.update_task(a.as_str(), TaskUpdate::default().title("Changed")).unwrap();
        store.add_task(NewTask::new("B"));

        assert_eq!(snapshot.revision(), 1);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(a.as_str()).unwrap().title, "A");
        assert_eq!(store.get_task(a.as_str()).unwrap().title, "Changed");
    }

    #[test]
    fn test_replace_all_with_demo_tasks() {
        let (mut store, clock) = test_store();
        store.add_task(NewTask::new("Old"));

        let count = store
            .replace_all(crate::seed::demo_tasks(today(), clock.now_ms()))
            .unwrap();

        assert_eq!(count, 7);
        assert_eq!(store.revision(), 2);
        let today_ids: Vec<&str> = store.today_tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(today_ids, vec!["1", "1-1"]);

        // Invalid input keeps the current forest
        let mut orphan = store.get_task("1-1").unwrap().clone();
        orphan.parent_id = Some(TaskId::from("nope"));
        assert!(matches!(store.replace_all(vec![orphan]), Err(StoreError::Corrupt(_))));
        assert_eq!(store.forest().len(), 7);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_list_view_uses_active_filter_and_sort() {
        let (mut store, _) = test_store();
        let low = store.add_task(NewTask::new("Low report").priority(Priority::Low));
        let urgent = store.add_task(NewTask::new("Urgent report").priority(Priority::Urgent));
        store.add_task(NewTask::new("Unrelated").priority(Priority::High));
        store
            .add_subtask(urgent.as_str(), NewTask::new("child report").priority(Priority::Low))
            .unwrap();
        store
            .add_subtask(urgent.as_str(), NewTask::new("child other"))
            .unwrap();

        store.set_filter(TaskFilter::default().search("report"));
        store.set_sort_option(SortOption::Priority);

        let view = store.list_view();
        let roots: Vec<&TaskId> = view.iter().map(|t| &t.task.id).collect();
        assert_eq!(roots, vec![&urgent, &low]);
        assert_eq!(view[0].subtasks.len(), 1);
        assert_eq!(view[0].subtasks[0].task.title, "child report");

        assert_eq!(store.sort_option(), SortOption::Priority);
        assert!(!store.filter().is_empty());
    }

    #[test]
    fn test_dashboard_uses_clock() {
        let (mut store, _) = test_store();
        store.add_task(NewTask::new("Due").due_date(today()));
        store.add_task(NewTask::new("Done").completed(true));

        let stats = store.dashboard();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.due_today, 1);
        assert_eq!(stats.progress_percentage, 50);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data/tasks.jsonl");

        let (mut store, _) = test_store();
        let a = store.add_task(NewTask::new("A").tag("x").tag("x").due_date(today()));
        let b = store.add_task(NewTask::new("B"));
        let a1 = store.add_subtask(a.as_str(), NewTask::new("A1")).unwrap();
        let a2 = store.add_subtask(a.as_str(), NewTask::new("A2").completed(true)).unwrap();
        let a1x = store.add_subtask(a1.as_str(), NewTask::new("A1x")).unwrap();
        store.save(&path).unwrap();

        let loaded = TaskStore::load(&path, FixedClock::on(today())).unwrap();
        let ids: Vec<&TaskId> = loaded.all_tasks().into_iter().map(|t| &t.id).collect();
        assert_eq!(ids, vec![&a, &a1, &a1x, &a2, &b]);
        assert_eq!(loaded.get_task(a.as_str()), store.get_task(a.as_str()));
        assert_eq!(loaded.get_task(a2.as_str()).unwrap().status, Status::Completed);
        assert_well_formed(&loaded);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = TaskStore::load(temp.path().join("none.jsonl"), SystemClock).unwrap();
        assert!(store.all_tasks().is_empty());
    }

    #[test]
    fn test_load_rejects_corrupt_snapshot() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tasks.jsonl");
        std::fs::write(
            &path,
            r#"{"id":"a","title":"A","parent_id":"missing","created_at":1,"updated_at":1}
"#,
        )
        .unwrap();

        let err = TaskStore::load(&path, SystemClock).unwrap_err();
        assert!(format!("{:#}", err).contains("missing parent"));
    }
}
