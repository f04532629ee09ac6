use chrono::{DateTime, TimeZone};
use std::rc::Rc;

use crate::filter::{self, FilterCriteria};
use crate::filter_store::FilterStore;
use crate::models::Task;
use crate::storage::SnapshotStorage;
use crate::task_store::TaskStore;

/// Both stores, rehydrated from one storage backend.
///
/// Tasks and criteria are persisted under separate keys and never touch each
/// other; the visible list is computed on demand from the two.
pub struct Tracker {
    pub tasks: TaskStore,
    pub filters: FilterStore,
}

impl Tracker {
    pub fn load(storage: Rc<dyn SnapshotStorage>) -> Self {
        Self {
            tasks: TaskStore::load(Rc::clone(&storage)),
            filters: FilterStore::load(storage),
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        self.filters.criteria()
    }

    /// Tasks passing the current criteria at `now`, in store order
    pub fn visible<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<&Task> {
        filter::visible(self.tasks.tasks(), self.filters.criteria(), now)
    }
}
