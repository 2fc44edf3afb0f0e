#![forbid(unsafe_code)]

//! Debounced two-stage selection timer with an anticipation highlight cycle.
//!
//! # State Machine
//!
//! ```text
//!            rearm(count >= 2)
//!   Idle ─────────────────────────▶ Armed { anticipation, commit }
//!    ▲                                 │ T - anticipation
//!    │ rearm / cancel_all              ▼
//!    ├──────────────────────── Anticipating { commit, cycle }
//!    │                                 │ T
//!    └─────────────────────────────────┘ commit fired
//! ```
//!
//! The scheduler only owns timing. Guards (selection not active, at least
//! two contacts) are evaluated by the caller each time a stage fires, never
//! cached here.

use web_time::Duration;

use crate::config::PickerConfig;
use crate::logging::TARGET_SCHEDULER;
use crate::timer::{TimerHandle, TimerQueue};

/// Something the scheduler wants the session to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// Stage 1: start the highlight cycle.
    AnticipationStart,
    /// Stage 2: draw a winner.
    Commit,
    /// Advance the highlight cursor.
    CycleStep,
}

#[derive(Debug, Clone, Copy)]
struct Cycle {
    handle: TimerHandle,
    cursor: usize,
}

/// Re-armable selection timer.
#[derive(Debug, Clone)]
pub struct SelectionScheduler {
    timers: TimerQueue<SchedulerEvent>,
    anticipation_start: Duration,
    commit_delay: Duration,
    cycle_interval: Duration,
    anticipation: Option<TimerHandle>,
    commit: Option<TimerHandle>,
    cycle: Option<Cycle>,
}

impl SelectionScheduler {
    #[must_use]
    pub fn new(config: &PickerConfig) -> Self {
        Self {
            timers: TimerQueue::new(),
            anticipation_start: config.anticipation_start(),
            commit_delay: config.auto_select_delay(),
            cycle_interval: config.cycle_interval(),
            anticipation: None,
            commit: None,
            cycle: None,
        }
    }

    /// Cancel everything pending and, with at least two contacts, schedule
    /// both stages from `now`.
    ///
    /// Returns `true` if the stages were armed.
    pub fn rearm(&mut self, now: Duration, contact_count: usize) -> bool {
        self.cancel_all();
        if contact_count < 2 {
            return false;
        }
        let anticipation =
            self.timers
                .schedule_once(now, self.anticipation_start, SchedulerEvent::AnticipationStart);
        let commit = self
            .timers
            .schedule_once(now, self.commit_delay, SchedulerEvent::Commit);
        self.anticipation = Some(anticipation);
        self.commit = Some(commit);
        tracing::debug!(
            target: TARGET_SCHEDULER,
            contacts = contact_count,
            commit_at_ms = (now + self.commit_delay).as_millis() as u64,
            "selection armed"
        );
        true
    }

    /// Cancel both stages and the cycle.
    pub fn cancel_all(&mut self) {
        if let Some(handle) = self.anticipation.take() {
            self.timers.cancel(handle);
        }
        if let Some(handle) = self.commit.take() {
            self.timers.cancel(handle);
        }
        self.stop_cycle();
        debug_assert!(self.timers.is_empty());
    }

    /// Both stages still pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.commit.is_some()
    }

    #[must_use]
    pub const fn is_cycling(&self) -> bool {
        self.cycle.is_some()
    }

    /// Current highlight cursor, if cycling.
    #[must_use]
    pub fn cycle_cursor(&self) -> Option<usize> {
        self.cycle.map(|c| c.cursor)
    }

    /// Deadline of the pending commit, if armed.
    #[must_use]
    pub fn commit_deadline(&self) -> Option<Duration> {
        self.commit.and_then(|h| self.timers.deadline(h))
    }

    /// Earliest instant anything is due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    /// Pop the earliest event due at `now`, updating stage bookkeeping.
    pub fn pop_due(&mut self, now: Duration) -> Option<SchedulerEvent> {
        let (handle, event) = self.timers.pop_due(now)?;
        match event {
            SchedulerEvent::AnticipationStart => {
                debug_assert_eq!(self.anticipation, Some(handle));
                self.anticipation = None;
            }
            SchedulerEvent::Commit => {
                debug_assert_eq!(self.commit, Some(handle));
                self.commit = None;
            }
            SchedulerEvent::CycleStep => {}
        }
        tracing::debug!(
            target: TARGET_SCHEDULER,
            event = ?event,
            at_ms = now.as_millis() as u64,
            "scheduler stage fired"
        );
        Some(event)
    }

    /// Begin the highlight cycle at cursor 0. No-op if already running.
    pub fn start_cycle(&mut self, now: Duration) {
        if self.cycle.is_some() {
            return;
        }
        let handle = self
            .timers
            .schedule_repeating(now, self.cycle_interval, SchedulerEvent::CycleStep);
        self.cycle = Some(Cycle { handle, cursor: 0 });
    }

    /// Advance the cursor, wrapping at `len`. Returns the new cursor.
    pub fn advance_cycle(&mut self, len: usize) -> Option<usize> {
        let cycle = self.cycle.as_mut()?;
        cycle.cursor = if len == 0 { 0 } else { (cycle.cursor + 1) % len };
        Some(cycle.cursor)
    }

    /// Stop the highlight cycle. Returns `true` if it was running.
    pub fn stop_cycle(&mut self) -> bool {
        match self.cycle.take() {
            Some(cycle) => {
                self.timers.cancel(cycle.handle);
                true
            }
            None => false,
        }
    }
}
