use log::{debug, warn};
use std::collections::HashSet;
use std::rc::Rc;

use crate::models::{Task, TaskId};
use crate::notify::{SubscriptionId, Subscribers};
use crate::storage::{self, SnapshotStorage, TASKS_KEY};

/// Owns the authoritative task collection.
///
/// Every effective mutation writes a full snapshot to storage and then notifies
/// subscribers with the whole collection. Calls naming an unknown id are no-ops:
/// nothing is written and nobody is notified.
pub struct TaskStore {
    tasks: Vec<Task>,
    storage: Rc<dyn SnapshotStorage>,
    subscribers: Subscribers<[Task]>,
}

impl TaskStore {
    /// Empty store that persists into `storage`; nothing is read
    pub fn new(storage: Rc<dyn SnapshotStorage>) -> Self {
        Self {
            tasks: Vec::new(),
            storage,
            subscribers: Subscribers::new(),
        }
    }

    /// Rehydrate from `storage`. An unreadable snapshot yields an empty store.
    pub fn load(storage: Rc<dyn SnapshotStorage>) -> Self {
        let tasks = match storage::load_snapshot::<Vec<Task>>(storage.as_ref(), TASKS_KEY) {
            Ok(Some(tasks)) => tasks,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("event=tasks_rehydrate status=failed error={}", e);
                Vec::new()
            }
        };

        let mut store = Self::new(storage);
        store.tasks = dedupe(tasks);
        debug!("event=tasks_rehydrate status=ok count={}", store.tasks.len());
        store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Every distinct tag across all tasks, in first-seen order
    pub fn all_tags(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .flat_map(|t| t.tags.iter())
            .filter(|tag| seen.insert(tag.as_str()))
            .cloned()
            .collect()
    }

    /// Append `task`. A task whose id is already present is ignored.
    pub fn add(&mut self, task: Task) -> bool {
        if self.get(task.id).is_some() {
            warn!("event=task_add status=duplicate id={}", task.id);
            return false;
        }
        debug!("event=task_add id={}", task.id);
        self.tasks.push(task);
        self.commit();
        true
    }

    pub fn remove(&mut self, id: TaskId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        self.tasks.remove(index);
        debug!("event=task_remove id={}", id);
        self.commit();
        true
    }

    pub fn toggle_completed(&mut self, id: TaskId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let task = &mut self.tasks[index];
        task.completed = !task.completed;
        debug!("event=task_toggle id={} completed={}", id, task.completed);
        self.commit();
        true
    }

    /// Replace the mutable fields of the task sharing `task.id`.
    /// The stored id and creation time are kept.
    pub fn update(&mut self, task: Task) -> bool {
        let Some(index) = self.position(task.id) else {
            return false;
        };
        let current = &mut self.tasks[index];
        current.title = task.title;
        current.completed = task.completed;
        current.due_date = task.due_date;
        current.priority = task.priority;
        current.tags = task.tags;
        debug!("event=task_update id={}", current.id);
        self.commit();
        true
    }

    /// Full-state snapshot of the collection
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    /// Replace the whole collection with `tasks`, persisting and notifying once
    pub fn restore(&mut self, tasks: Vec<Task>) {
        self.tasks = dedupe(tasks);
        self.commit();
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&[Task]) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    fn commit(&mut self) {
        if let Err(e) = storage::save_snapshot(self.storage.as_ref(), TASKS_KEY, &self.tasks) {
            warn!("event=tasks_persist status=failed error={}", e);
        }
        self.subscribers.notify(&self.tasks);
    }
}

/// Drop repeated ids, keeping the first occurrence
fn dedupe(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    let before = tasks.len();
    let unique: Vec<Task> = tasks.into_iter().filter(|t| seen.insert(t.id)).collect();
    if unique.len() != before {
        warn!("event=tasks_dedupe dropped={}", before - unique.len());
    }
    unique
}
