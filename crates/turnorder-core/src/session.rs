#![forbid(unsafe_code)]

//! The selection session: one explicit context object per running instance.
//!
//! [`Session`] owns the mode controller, the contact tracker, the selection
//! scheduler, and the random source. Hosts bind real input to the
//! `on_contact_*` entry points, advance time with [`Session::advance_to`],
//! flush coalesced positions with [`Session::frame`], and drain
//! [`Notice`]s for presentation.
//!
//! # Invariants
//!
//! 1. `winner().is_some() == selection_active()`.
//! 2. While a selection is active no contact is added and nothing is armed.
//! 3. The tracked count never exceeds the contact limit.
//! 4. The mode only changes while no selection is active.
//! 5. After [`Session::reset`] no contact, winner, marker, or timer remains.
//!
//! # Failure Modes
//!
//! None of the entry points fail. Refused operations return a value
//! describing why and leave the state untouched; a missing presentation
//! layer only means nobody drains the bounded outbox.

use web_time::Duration;

use crate::config::{ConfigError, PickerConfig};
use crate::contact::{AddRejection, Contact, ContactId, ContactTracker, Position, SizeHint};
use crate::logging::{TARGET_CONTACT, TARGET_SELECTION, TARGET_SESSION};
use crate::mode::{Mode, ModeController, ModeRequestOutcome, ModeStore};
use crate::notice::{Notice, Outbox};
use crate::random::{RandomSource, SystemRandom};
use crate::scheduler::{SchedulerEvent, SelectionScheduler};
use crate::selection::draw_winner;

/// Observable session state, cheap to compare and hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionSnapshot {
    pub now: Duration,
    pub mode: Mode,
    pub selection_active: bool,
    pub winner: Option<ContactId>,
    /// Tracked contacts in insertion order.
    pub active: Vec<ContactId>,
    /// Winner marker still on screen after its contact lifted.
    pub winner_marker_retained: bool,
    pub armed: bool,
    pub highlighted: Option<ContactId>,
}

/// Multi-contact selection engine.
pub struct Session<R: RandomSource = SystemRandom> {
    config: PickerConfig,
    now: Duration,
    mode: ModeController,
    tracker: ContactTracker,
    scheduler: SelectionScheduler,
    rng: R,
    winner: Option<ContactId>,
    winner_marker_retained: bool,
    last_stable_count: usize,
    outbox: Outbox,
}

impl<R: RandomSource> core::fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("now", &self.now)
            .field("mode", &self.mode.current())
            .field("contacts", &self.tracker.len())
            .field("winner", &self.winner)
            .field("armed", &self.scheduler.is_armed())
            .field("pending_notices", &self.outbox.len())
            .finish()
    }
}

impl Session<SystemRandom> {
    /// Session with the system random source.
    pub fn with_store(config: PickerConfig, store: Box<dyn ModeStore>) -> Result<Self, ConfigError> {
        Self::new(config, store, SystemRandom::new())
    }
}

impl<R: RandomSource> Session<R> {
    /// Build a session, restoring the last persisted mode from `store`.
    pub fn new(config: PickerConfig, store: Box<dyn ModeStore>, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let mode = ModeController::restore(config.storage_key.clone(), store);
        let tracker = ContactTracker::new(config.max_contacts(None), config.palm_rejection_px);
        let scheduler = SelectionScheduler::new(&config);
        let outbox = Outbox::new(config.notice_capacity);
        tracing::debug!(
            target: TARGET_SESSION,
            mode = %mode.current(),
            max_contacts = tracker.max_contacts(),
            "session created"
        );
        Ok(Self {
            config,
            now: Duration::ZERO,
            mode,
            tracker,
            scheduler,
            rng,
            winner: None,
            winner_marker_retained: false,
            last_stable_count: 0,
            outbox,
        })
    }

    // ── Inspection ─────────────────────────────────────────────────────

    #[must_use]
    pub const fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode.current()
    }

    #[must_use]
    pub const fn selection_active(&self) -> bool {
        self.mode.selection_active()
    }

    #[must_use]
    pub const fn winner(&self) -> Option<ContactId> {
        self.winner
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tracker.len()
    }

    /// Last count reported through [`Notice::CountChanged`].
    #[must_use]
    pub const fn last_stable_count(&self) -> usize {
        self.last_stable_count
    }

    #[must_use]
    pub fn contacts(&self) -> &[Contact] {
        self.tracker.contacts()
    }

    #[must_use]
    pub const fn max_contacts(&self) -> usize {
        self.tracker.max_contacts()
    }

    /// A selection is scheduled.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.scheduler.is_armed()
    }

    #[must_use]
    pub const fn is_anticipating(&self) -> bool {
        self.scheduler.is_cycling()
    }

    /// Contact currently highlighted by the anticipation cycle.
    #[must_use]
    pub fn highlighted(&self) -> Option<ContactId> {
        let cursor = self.scheduler.cycle_cursor()?;
        self.tracker.contacts().get(cursor).map(|c| c.id)
    }

    #[must_use]
    pub const fn winner_marker_retained(&self) -> bool {
        self.winner_marker_retained
    }

    /// Earliest instant a timer is due, for hosts that sleep between frames.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    /// Persisted last-mode value as currently stored.
    #[must_use]
    pub fn persisted_mode(&self) -> Option<String> {
        self.mode.persisted()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            now: self.now,
            mode: self.mode(),
            selection_active: self.selection_active(),
            winner: self.winner,
            active: self.tracker.ids().collect(),
            winner_marker_retained: self.winner_marker_retained,
            armed: self.is_armed(),
            highlighted: self.highlighted(),
        }
    }

    /// Check the session invariants, naming the first one that is broken.
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        if self.winner.is_some() != self.selection_active() {
            return Err("winner must be set exactly while selection is active");
        }
        if self.selection_active() {
            if self.scheduler.is_armed() || self.scheduler.is_cycling() {
                return Err("nothing may be scheduled during a selection");
            }
            if self.tracker.len() > 1 {
                return Err("only the winner may stay tracked during a selection");
            }
            if let Some(contact) = self.tracker.contacts().first()
                && Some(contact.id) != self.winner
            {
                return Err("the tracked contact during a selection must be the winner");
            }
        } else if self.winner_marker_retained {
            return Err("a retained winner marker requires an active selection");
        }
        if self.tracker.len() > self.tracker.max_contacts() {
            return Err("contact count exceeds the limit");
        }
        if self.mode() != Mode::ContactPick && !self.tracker.is_empty() {
            return Err("contacts are only tracked in contact-pick mode");
        }
        Ok(())
    }

    /// Take all pending presentation notices.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.outbox.drain()
    }

    /// Notices waiting to be drained.
    #[must_use]
    pub fn pending_notices(&self) -> usize {
        self.outbox.len()
    }

    /// Notices lost because the outbox was full.
    #[must_use]
    pub const fn dropped_notices(&self) -> u64 {
        self.outbox.dropped()
    }

    // ── Configuration ──────────────────────────────────────────────────

    /// Apply the device-reported touch capability (`navigator.maxTouchPoints`).
    ///
    /// A limit below the current count takes effect as contacts release;
    /// tracked contacts are never dropped to honor it.
    pub fn set_device_max_touch_points(&mut self, points: Option<u32>) {
        let requested = self.config.max_contacts(points);
        self.tracker.set_max_contacts(requested);
        tracing::debug!(
            target: TARGET_CONTACT,
            device_points = ?points,
            requested,
            max_contacts = self.tracker.max_contacts(),
            "contact limit updated"
        );
    }

    // ── Mode ───────────────────────────────────────────────────────────

    /// Switch interaction mode.
    pub fn request_mode(&mut self, target: Mode) -> ModeRequestOutcome {
        let _span = tracing::debug_span!("session.op", op = "request_mode", requested = %target).entered();
        let outcome = self.mode.request(target);
        match outcome {
            ModeRequestOutcome::Switched { from, to } => {
                if from == Mode::ContactPick {
                    self.discard_contacts();
                }
                self.outbox.push(Notice::ModeChanged { mode: to });
            }
            ModeRequestOutcome::RejectedDuringSelection => {
                self.outbox.push(Notice::ModeSwitchRejected { requested: target });
            }
            ModeRequestOutcome::Unchanged => {}
        }
        outcome
    }

    // ── Contacts ───────────────────────────────────────────────────────

    /// Press: start tracking a contact.
    pub fn on_contact_start(
        &mut self,
        id: ContactId,
        position: Position,
        size: Option<SizeHint>,
    ) -> Result<(), AddRejection> {
        let _span = tracing::debug_span!("session.op", op = "contact_start", id = id.0).entered();
        let result = self.add_contact(id, position, size);
        if let Err(reason) = result {
            tracing::debug!(
                target: TARGET_CONTACT,
                id = id.0,
                reason = reason.as_str(),
                "contact ignored"
            );
            if reason == AddRejection::AtCapacity {
                self.outbox.push(Notice::CapacityPulse { id });
            }
        }
        result
    }

    fn add_contact(
        &mut self,
        id: ContactId,
        position: Position,
        size: Option<SizeHint>,
    ) -> Result<(), AddRejection> {
        if self.mode() != Mode::ContactPick {
            return Err(AddRejection::WrongMode);
        }
        if self.selection_active() {
            return Err(AddRejection::SelectionActive);
        }
        let contact = self.tracker.add(id, position, size)?;
        tracing::debug!(
            target: TARGET_CONTACT,
            id = id.0,
            slot = contact.slot,
            count = self.tracker.len(),
            "contact added"
        );
        self.outbox.push(Notice::MarkerCreated {
            id,
            slot: contact.slot,
            position,
        });
        self.notify_count();
        self.reevaluate();
        Ok(())
    }

    /// Move: queue a position for the next frame.
    pub fn on_contact_move(&mut self, id: ContactId, position: Position) -> bool {
        if self.mode() != Mode::ContactPick {
            return false;
        }
        self.tracker.queue_move(id, position)
    }

    /// Release or cancel.
    ///
    /// Returns `false` for ids that are not tracked.
    pub fn on_contact_end(&mut self, id: ContactId) -> bool {
        let _span = tracing::debug_span!("session.op", op = "contact_end", id = id.0).entered();
        if self.tracker.remove(id).is_none() {
            return false;
        }
        if self.selection_active() && self.winner == Some(id) {
            self.winner_marker_retained = true;
            tracing::debug!(target: TARGET_CONTACT, id = id.0, "winner released, marker kept");
            self.outbox.push(Notice::WinnerReleased { id });
        } else {
            tracing::debug!(
                target: TARGET_CONTACT,
                id = id.0,
                count = self.tracker.len(),
                "contact removed"
            );
            self.outbox.push(Notice::MarkerRemoved { id });
        }
        self.notify_count();
        self.reevaluate();
        true
    }

    /// Rendering-frame boundary: apply coalesced positions.
    ///
    /// Returns the number of markers moved.
    pub fn frame(&mut self) -> usize {
        let moves = self.tracker.flush_moves();
        for &(id, position) in &moves {
            self.outbox.push(Notice::MarkerMoved { id, position });
        }
        if !moves.is_empty() {
            tracing::trace!(target: TARGET_CONTACT, moved = moves.len(), "positions flushed");
        }
        moves.len()
    }

    // ── Time ───────────────────────────────────────────────────────────

    /// Advance virtual time to `now`, firing every timer due on the way.
    ///
    /// Each timer fires at its own deadline, so callbacks observe the time
    /// they were scheduled for. Time never moves backwards; an earlier
    /// `now` is ignored.
    pub fn advance_to(&mut self, now: Duration) {
        if now < self.now {
            tracing::trace!(
                target: TARGET_SESSION,
                now_ms = now.as_millis() as u64,
                current_ms = self.now.as_millis() as u64,
                "ignoring backwards time"
            );
            return;
        }
        while let Some(deadline) = self.scheduler.next_deadline()
            && deadline <= now
        {
            self.now = self.now.max(deadline);
            let Some(event) = self.scheduler.pop_due(self.now) else {
                break;
            };
            self.handle_scheduler_event(event);
        }
        self.now = now;
    }

    /// Advance virtual time by `dt`.
    pub fn advance_by(&mut self, dt: Duration) {
        self.advance_to(self.now.saturating_add(dt));
    }

    fn guard_holds(&self) -> bool {
        self.mode() == Mode::ContactPick && !self.selection_active() && self.tracker.len() >= 2
    }

    fn handle_scheduler_event(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::AnticipationStart => {
                if self.guard_holds() {
                    self.scheduler.start_cycle(self.now);
                    self.outbox.push(Notice::AnticipationStarted);
                    if let Some(id) = self.highlighted() {
                        self.outbox.push(Notice::Highlight { id });
                    }
                }
            }
            SchedulerEvent::CycleStep => {
                if self.guard_holds() {
                    self.scheduler.advance_cycle(self.tracker.len());
                    if let Some(id) = self.highlighted() {
                        self.outbox.push(Notice::Highlight { id });
                    }
                } else {
                    self.stop_anticipation();
                }
            }
            SchedulerEvent::Commit => {
                if self.guard_holds() {
                    self.pick_winner();
                } else {
                    self.stop_anticipation();
                }
            }
        }
    }

    fn stop_anticipation(&mut self) {
        if self.scheduler.stop_cycle() {
            self.outbox.push(Notice::AnticipationStopped);
        }
    }

    /// Re-arm from the latest change, or disarm during a selection.
    fn reevaluate(&mut self) {
        self.stop_anticipation();
        if self.selection_active() {
            self.scheduler.cancel_all();
        } else {
            self.scheduler.rearm(self.now, self.tracker.len());
        }
    }

    fn notify_count(&mut self) {
        let count = self.tracker.len();
        if count != self.last_stable_count {
            self.last_stable_count = count;
            self.outbox.push(Notice::CountChanged { count });
        }
    }

    // ── Selection ──────────────────────────────────────────────────────

    /// Draw a winner among the tracked contacts now.
    ///
    /// Needs at least two contacts and no active selection; otherwise this
    /// is a no-op returning `None`.
    pub fn pick_winner(&mut self) -> Option<ContactId> {
        if self.selection_active() {
            return None;
        }
        let winner = draw_winner(self.tracker.contacts(), &mut self.rng)?;
        let candidates = self.tracker.len();
        self.stop_anticipation();
        self.scheduler.cancel_all();
        self.winner = Some(winner);
        self.mode.set_selection_active(true);
        for dropped in self.tracker.retain_only(winner) {
            self.outbox.push(Notice::MarkerRemoved { id: dropped.id });
        }
        self.outbox.push(Notice::WinnerSelected { id: winner });
        self.notify_count();
        tracing::info!(
            target: TARGET_SELECTION,
            winner = winner.0,
            candidates,
            secure = self.rng.is_secure(),
            "winner selected"
        );
        Some(winner)
    }

    /// Test hook: force the selection flag.
    ///
    /// `true` freezes the first tracked contact as winner without drawing,
    /// so the winner/flag invariant holds; with nothing tracked it is
    /// refused. `false` is a full [`reset`](Self::reset). Returns whether
    /// the flag now has the requested value.
    pub fn force_selection_active(&mut self, active: bool) -> bool {
        if !active {
            self.reset();
            return true;
        }
        if self.selection_active() {
            return true;
        }
        let Some(first) = self.tracker.contacts().first().map(|c| c.id) else {
            return false;
        };
        self.stop_anticipation();
        self.scheduler.cancel_all();
        self.winner = Some(first);
        self.mode.set_selection_active(true);
        for dropped in self.tracker.retain_only(first) {
            self.outbox.push(Notice::MarkerRemoved { id: dropped.id });
        }
        self.outbox.push(Notice::WinnerSelected { id: first });
        self.notify_count();
        true
    }

    // ── Reset ──────────────────────────────────────────────────────────

    /// Return to the initial empty state. Always succeeds.
    pub fn reset(&mut self) {
        let _span = tracing::debug_span!("session.op", op = "reset").entered();
        self.discard_contacts();
        self.winner = None;
        self.mode.set_selection_active(false);
        self.last_stable_count = 0;
        self.outbox.push(Notice::Reset);
        tracing::info!(target: TARGET_SESSION, mode = %self.mode(), "session reset");
    }

    /// Cancel timers and destroy every contact and marker, retained
    /// winner marker included.
    fn discard_contacts(&mut self) {
        self.stop_anticipation();
        self.scheduler.cancel_all();
        for contact in self.tracker.clear() {
            self.outbox.push(Notice::MarkerRemoved { id: contact.id });
        }
        if self.winner_marker_retained {
            self.winner_marker_retained = false;
            if let Some(id) = self.winner {
                self.outbox.push(Notice::MarkerRemoved { id });
            }
        }
        self.notify_count();
    }
}
