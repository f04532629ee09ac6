use log::{debug, warn};
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::filter::{DateRange, FilterCriteria, StatusFilter};
use crate::models::Priority;
use crate::notify::{SubscriptionId, Subscribers};
use crate::storage::{self, FILTERS_KEY, SnapshotStorage};

/// Owns the active filter criteria, persisted independently of the tasks.
///
/// Each setter replaces exactly one field, then persists and notifies once.
/// No validation happens here.
pub struct FilterStore {
    criteria: FilterCriteria,
    storage: Rc<dyn SnapshotStorage>,
    subscribers: Subscribers<FilterCriteria>,
}

impl FilterStore {
    pub fn new(storage: Rc<dyn SnapshotStorage>) -> Self {
        Self {
            criteria: FilterCriteria::default(),
            storage,
            subscribers: Subscribers::new(),
        }
    }

    /// Rehydrate from `storage`, falling back to defaults
    pub fn load(storage: Rc<dyn SnapshotStorage>) -> Self {
        let criteria = match storage::load_snapshot::<FilterCriteria>(storage.as_ref(), FILTERS_KEY) {
            Ok(Some(criteria)) => criteria,
            Ok(None) => FilterCriteria::default(),
            Err(e) => {
                warn!("event=filters_rehydrate status=failed error={}", e);
                FilterCriteria::default()
            }
        };

        let mut store = Self::new(storage);
        store.criteria = criteria;
        store
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn summary(&self) -> String {
        self.criteria.summary()
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.criteria.status = status;
        debug!("event=filter_set field=status value={}", status);
        self.commit();
    }

    pub fn set_priority(&mut self, priority: BTreeSet<Priority>) {
        self.criteria.priority = priority;
        debug!("event=filter_set field=priority count={}", self.criteria.priority.len());
        self.commit();
    }

    pub fn set_date_range(&mut self, date_range: DateRange) {
        self.criteria.date_range = date_range;
        debug!("event=filter_set field=date_range value={}", date_range);
        self.commit();
    }

    pub fn set_search(&mut self, search: String) {
        self.criteria.search = search;
        debug!("event=filter_set field=search len={}", self.criteria.search.chars().count());
        self.commit();
    }

    pub fn set_tags(&mut self, tags: BTreeSet<String>) {
        self.criteria.tags = tags;
        debug!("event=filter_set field=tags count={}", self.criteria.tags.len());
        self.commit();
    }

    /// Restore every field to its default in a single notification
    pub fn reset_filters(&mut self) {
        self.criteria = FilterCriteria::default();
        debug!("event=filter_reset");
        self.commit();
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&FilterCriteria) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    fn commit(&mut self) {
        if let Err(e) = storage::save_snapshot(self.storage.as_ref(), FILTERS_KEY, &self.criteria) {
            warn!("event=filters_persist status=failed error={}", e);
        }
        self.subscribers.notify(&self.criteria);
    }
}
