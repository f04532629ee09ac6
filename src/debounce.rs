use std::time::{Duration, Instant};

/// Window used for search propagation unless configured otherwise
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

/// Delays and coalesces values: each `push` restarts the countdown, and `poll`
/// releases the latest value exactly once after a full quiet window.
///
/// The caller drives time, so the event loop polls it on every tick the same
/// way it expires status messages.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `value`, replacing anything still pending
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            deadline: now + self.window,
        });
    }

    /// Take the pending value if its quiet window has elapsed at `now`
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let ready = self.pending.as_ref().is_some_and(|p| now >= p.deadline);
        if ready {
            self.pending.take().map(|p| p.value)
        } else {
            None
        }
    }

    /// Take the pending value immediately, ignoring the window
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.value)
    }

    /// Drop any pending value. Returns true if something was dropped.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fires_once_after_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));
        debouncer.push("a", start);

        assert_eq!(debouncer.poll(start + ms(299)), None);
        assert_eq!(debouncer.poll(start + ms(300)), Some("a"));
        assert_eq!(debouncer.poll(start + ms(900)), None);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn each_push_restarts_the_countdown() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));
        debouncer.push(1, start);
        debouncer.push(2, start + ms(200));
        assert_eq!(debouncer.poll(start + ms(400)), None);
        assert_eq!(debouncer.deadline(), Some(start + ms(500)));
        assert_eq!(debouncer.poll(start + ms(500)), Some(2));
    }

    #[test]
    fn cancel_drops_pending_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(ms(300));
        assert!(!debouncer.cancel());
        debouncer.push("x", start);
        assert!(debouncer.cancel());
        assert_eq!(debouncer.poll(start + ms(1000)), None);
    }

    #[test]
    fn flush_ignores_window() {
        let mut debouncer: Debouncer<&str> = Debouncer::default();
        assert_eq!(debouncer.window(), DEFAULT_WINDOW);
        debouncer.push("now", Instant::now());
        assert_eq!(debouncer.flush(), Some("now"));
        assert_eq!(debouncer.flush(), None);
    }
}
