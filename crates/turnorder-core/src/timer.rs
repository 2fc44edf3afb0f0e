#![forbid(unsafe_code)]

//! Cancellable one-shot and repeating timers on a host-driven clock.
//!
//! [`TimerQueue`] never reads wall-clock time. The owner advances it with
//! [`TimerQueue::pop_due`], passing the current monotonic instant, and fires
//! the returned payloads itself. Because entries are popped one at a time,
//! a callback that cancels another timer prevents it from firing even when
//! both were due at the same instant.
//!
//! # Invariants
//!
//! 1. A cancelled handle never fires, including repeating timers.
//! 2. Due entries are returned in deadline order; ties fire in scheduling
//!    order.
//! 3. A repeating timer fires at most once per `pop_due` call even if
//!    several periods elapsed; the next deadline is re-based on the fire
//!    instant.

use std::collections::BTreeMap;

use web_time::Duration;

/// Opaque handle for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Raw identifier, for logging.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct TimerEntry<T> {
    payload: T,
    period: Option<Duration>,
}

/// Deadline-ordered timer queue.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    // (deadline, handle) ordering gives deadline order with FIFO tie-break,
    // since handles are allocated monotonically.
    by_deadline: BTreeMap<(Duration, TimerHandle), TimerEntry<T>>,
    deadlines: BTreeMap<TimerHandle, Duration>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            by_deadline: BTreeMap::new(),
            deadlines: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone> TimerQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        handle
    }

    fn insert(&mut self, handle: TimerHandle, deadline: Duration, entry: TimerEntry<T>) {
        self.by_deadline.insert((deadline, handle), entry);
        self.deadlines.insert(handle, deadline);
    }

    /// Fire `payload` once at `now + delay`.
    pub fn schedule_once(&mut self, now: Duration, delay: Duration, payload: T) -> TimerHandle {
        let handle = self.allocate();
        self.insert(
            handle,
            now.saturating_add(delay),
            TimerEntry {
                payload,
                period: None,
            },
        );
        handle
    }

    /// Fire `payload` every `period`, first at `now + period`.
    ///
    /// A zero period is treated as one millisecond so the queue can always
    /// make progress.
    pub fn schedule_repeating(&mut self, now: Duration, period: Duration, payload: T) -> TimerHandle {
        let period = period.max(Duration::from_millis(1));
        let handle = self.allocate();
        self.insert(
            handle,
            now.saturating_add(period),
            TimerEntry {
                payload,
                period: Some(period),
            },
        );
        handle
    }

    /// Cancel a timer. Returns `true` if it was still pending.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle) {
            Some(deadline) => self.by_deadline.remove(&(deadline, handle)).is_some(),
            None => false,
        }
    }

    /// Cancel every pending timer.
    pub fn clear(&mut self) {
        self.by_deadline.clear();
        self.deadlines.clear();
    }

    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle)
    }

    #[must_use]
    pub fn deadline(&self, handle: TimerHandle) -> Option<Duration> {
        self.deadlines.get(&handle).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Earliest pending deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.by_deadline.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest entry due at or before `now`.
    ///
    /// Repeating entries are re-queued at `now + period` before returning.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerHandle, T)> {
        let key = *self.by_deadline.keys().next()?;
        if key.0 > now {
            return None;
        }
        let (_, handle) = key;
        let entry = self.by_deadline.remove(&key)?;
        self.deadlines.remove(&handle);
        if let Some(period) = entry.period {
            self.insert(handle, now.saturating_add(period), entry.clone());
        }
        Some((handle, entry.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn once_fires_at_deadline_only() {
        let mut q = TimerQueue::new();
        let h = q.schedule_once(ms(0), ms(100), "a");
        assert!(q.pop_due(ms(99)).is_none());
        assert_eq!(q.pop_due(ms(100)), Some((h, "a")));
        assert!(q.pop_due(ms(1_000)).is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let h = q.schedule_once(ms(0), ms(10), 1);
        assert!(q.cancel(h));
        assert!(!q.cancel(h));
        assert!(q.pop_due(ms(50)).is_none());
        assert!(!q.is_pending(h));
    }

    #[test]
    fn ties_fire_in_scheduling_order() {
        let mut q = TimerQueue::new();
        let a = q.schedule_once(ms(0), ms(10), 'a');
        let b = q.schedule_once(ms(0), ms(10), 'b');
        let early = q.schedule_once(ms(0), ms(5), 'e');
        assert_eq!(q.pop_due(ms(10)), Some((early, 'e')));
        assert_eq!(q.pop_due(ms(10)), Some((a, 'a')));
        assert_eq!(q.pop_due(ms(10)), Some((b, 'b')));
    }

    #[test]
    fn cancel_between_pops_suppresses_same_instant_fire() {
        let mut q = TimerQueue::new();
        let first = q.schedule_once(ms(0), ms(10), 1);
        let second = q.schedule_once(ms(0), ms(10), 2);
        assert_eq!(q.pop_due(ms(10)), Some((first, 1)));
        q.cancel(second);
        assert!(q.pop_due(ms(10)).is_none());
    }

    #[test]
    fn repeating_rebases_on_fire_instant() {
        let mut q = TimerQueue::new();
        let h = q.schedule_repeating(ms(0), ms(110), ());
        assert_eq!(q.deadline(h), Some(ms(110)));
        assert_eq!(q.pop_due(ms(300)), Some((h, ())));
        assert_eq!(q.deadline(h), Some(ms(410)));
        assert!(q.pop_due(ms(300)).is_none());
        assert!(q.cancel(h));
        assert!(q.pop_due(ms(10_000)).is_none());
    }

    #[test]
    fn zero_period_does_not_spin() {
        let mut q = TimerQueue::new();
        q.schedule_repeating(ms(5), Duration::ZERO, ());
        assert!(q.pop_due(ms(6)).is_some());
        assert!(q.pop_due(ms(6)).is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let mut q = TimerQueue::new();
        q.schedule_once(ms(0), ms(1), 0);
        q.schedule_repeating(ms(0), ms(1), 0);
        assert_eq!(q.len(), 2);
        q.clear();
        assert_eq!(q.next_deadline(), None);
        assert!(q.pop_due(ms(100)).is_none());
    }
}
