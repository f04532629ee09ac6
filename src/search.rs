use std::time::{Duration, Instant};

use crate::debounce::Debouncer;
use crate::filter_store::FilterStore;

/// Free-text search input.
///
/// Keystrokes update the local text at once; the filter store only sees the
/// text after a quiet window, so a burst of typing results in one update.
#[derive(Debug, Clone)]
pub struct SearchBox {
    text: String,
    debouncer: Debouncer<String>,
}

impl SearchBox {
    pub fn new(window: Duration) -> Self {
        Self {
            text: String::new(),
            debouncer: Debouncer::new(window),
        }
    }

    /// Start from text already applied to the criteria; nothing is scheduled
    pub fn with_text(text: &str, window: Duration) -> Self {
        Self {
            text: text.to_string(),
            debouncer: Debouncer::new(window),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: String, now: Instant) {
        self.text = text;
        self.debouncer.push(self.text.clone(), now);
    }

    pub fn push_char(&mut self, c: char, now: Instant) {
        self.text.push(c);
        self.debouncer.push(self.text.clone(), now);
    }

    pub fn pop_char(&mut self, now: Instant) {
        if self.text.pop().is_some() {
            self.debouncer.push(self.text.clone(), now);
        }
    }

    pub fn clear(&mut self, now: Instant) {
        if !self.text.is_empty() {
            self.set_text(String::new(), now);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Propagate the pending text into `filters` once its window has elapsed.
    /// Returns true when the store was updated.
    pub fn tick(&mut self, now: Instant, filters: &mut FilterStore) -> bool {
        match self.debouncer.poll(now) {
            Some(text) => {
                if filters.criteria().search != text {
                    filters.set_search(text);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    /// Sync local text with criteria changed elsewhere (for example a reset),
    /// dropping anything still pending
    pub fn sync_from(&mut self, search: &str) {
        self.debouncer.cancel();
        self.text = search.to_string();
    }

    /// Cancel pending propagation; call when the search control goes away
    pub fn teardown(&mut self) {
        self.debouncer.cancel();
    }
}
