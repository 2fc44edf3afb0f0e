#![forbid(unsafe_code)]

//! `turnorder-web` drives a [`Session`] from an embedding host.
//!
//! Design goals:
//! - **Host-driven input**: the embedding environment (JS) pushes contact
//!   events; nothing here reads the DOM.
//! - **Deterministic time**: the host advances a monotonic clock explicitly,
//!   so every timer firing is reproducible.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! This crate does not bind to `wasm-bindgen`; `turnorder-wasm` wraps it with
//! the JS API.

#[cfg(feature = "input-parser")]
pub mod input_parser;
pub mod session_record;

use core::time::Duration;
use std::collections::VecDeque;

use turnorder_core::{
    AddRejection, ConfigError, ContactId, Mode, ModeRequestOutcome, ModeStore, Notice,
    PickerConfig, Position, RandomSource, Session, SizeHint, SystemRandom,
};

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Set current monotonic time. Earlier values are ignored.
    pub fn set(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }
}

/// One host input, already mapped from the platform's pointer model.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactInput {
    /// Pointer down.
    Down {
        id: ContactId,
        position: Position,
        size: Option<SizeHint>,
    },
    /// Pointer move.
    Move { id: ContactId, position: Position },
    /// Pointer up.
    Up { id: ContactId },
    /// Pointer cancelled by the platform.
    Cancel { id: ContactId },
    /// Reset control.
    Reset,
    /// Mode toggle.
    SetMode(Mode),
}

impl ContactInput {
    /// Short label for logs and traces.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Down { .. } => "down",
            Self::Move { .. } => "move",
            Self::Up { .. } => "up",
            Self::Cancel { .. } => "cancel",
            Self::Reset => "reset",
            Self::SetMode(_) => "mode",
        }
    }
}

/// What one [`PickerHost::step`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResult {
    /// Queued inputs applied, in arrival order.
    pub inputs_processed: usize,
    /// Presses the session refused, with the reason.
    pub rejected: Vec<(ContactId, AddRejection)>,
    /// Mode requests that were refused.
    pub mode_rejections: usize,
    /// Markers moved by the frame flush at the end of the step.
    pub frame_flushed: usize,
    /// Notices produced during the step.
    pub notices: Vec<Notice>,
}

/// Host adapter: clock, input queue, and session.
pub struct PickerHost<R: RandomSource = SystemRandom> {
    clock: DeterministicClock,
    queue: VecDeque<ContactInput>,
    session: Session<R>,
    steps: u64,
}

impl<R: RandomSource> core::fmt::Debug for PickerHost<R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PickerHost")
            .field("clock", &self.clock)
            .field("queued", &self.queue.len())
            .field("session", &self.session)
            .field("steps", &self.steps)
            .finish()
    }
}

impl PickerHost<SystemRandom> {
    /// Host over a session with the system random source.
    pub fn with_store(config: PickerConfig, store: Box<dyn ModeStore>) -> Result<Self, ConfigError> {
        Self::new(config, store, SystemRandom::new())
    }
}

impl<R: RandomSource> PickerHost<R> {
    /// Create a host; fails only on invalid configuration.
    pub fn new(config: PickerConfig, store: Box<dyn ModeStore>, rng: R) -> Result<Self, ConfigError> {
        Ok(Self {
            clock: DeterministicClock::new(),
            queue: VecDeque::new(),
            session: Session::new(config, store, rng)?,
            steps: 0,
        })
    }

    /// Current host time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Set the clock; earlier values are ignored.
    pub fn set_time(&mut self, now: Duration) {
        self.clock.set(now);
    }

    /// Advance the clock by `dt`.
    pub fn advance_time(&mut self, dt: Duration) {
        self.clock.advance(dt);
    }

    /// Queue an input for the next step.
    pub fn push_input(&mut self, input: ContactInput) {
        self.queue.push_back(input);
    }

    /// Inputs waiting for the next step.
    #[must_use]
    pub fn pending_inputs(&self) -> usize {
        self.queue.len()
    }

    /// Steps taken so far.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    #[must_use]
    pub const fn session(&self) -> &Session<R> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<R> {
        &mut self.session
    }

    /// Apply queued inputs, fire timers up to the clock, then flush a frame.
    ///
    /// Timers due at or before the clock fire first, each at its own
    /// deadline. Queued inputs then apply at the clock's time.
    pub fn step(&mut self) -> StepResult {
        let now = self.clock.now();
        self.session.advance_to(now);

        let mut result = StepResult::default();
        while let Some(input) = self.queue.pop_front() {
            self.apply(input, &mut result);
            result.inputs_processed += 1;
        }
        self.session.advance_to(now);
        result.frame_flushed = self.session.frame();
        result.notices = self.session.drain_notices();
        self.steps += 1;

        #[cfg(feature = "tracing")]
        tracing::trace!(
            target: "turnorder.web",
            step = self.steps,
            now_ms = now.as_millis() as u64,
            inputs = result.inputs_processed,
            notices = result.notices.len(),
            "host step"
        );
        result
    }

    /// Flush coalesced marker positions without processing inputs.
    pub fn frame(&mut self) -> usize {
        self.session.frame()
    }

    /// Take notices produced outside of [`step`](Self::step).
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.session.drain_notices()
    }

    fn apply(&mut self, input: ContactInput, result: &mut StepResult) {
        match input {
            ContactInput::Down { id, position, size } => {
                if let Err(reason) = self.session.on_contact_start(id, position, size) {
                    result.rejected.push((id, reason));
                }
            }
            ContactInput::Move { id, position } => {
                self.session.on_contact_move(id, position);
            }
            ContactInput::Up { id } | ContactInput::Cancel { id } => {
                self.session.on_contact_end(id);
            }
            ContactInput::Reset => self.session.reset(),
            ContactInput::SetMode(mode) => {
                if self.session.request_mode(mode) == ModeRequestOutcome::RejectedDuringSelection {
                    result.mode_rejections += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use turnorder_core::{MemoryModeStore, ScriptedRandom};

    const MS_16: Duration = Duration::from_millis(16);

    fn host(script: &[usize]) -> PickerHost<ScriptedRandom> {
        PickerHost::new(
            PickerConfig::default(),
            Box::new(MemoryModeStore::with_value(
                "turnorder.lastMode",
                "contact-pick",
            )),
            ScriptedRandom::new(script.to_vec()),
        )
        .unwrap()
    }

    fn down(n: u32) -> ContactInput {
        ContactInput::Down {
            id: ContactId(n),
            position: Position::new(n as f32 * 10.0, 5.0),
            size: None,
        }
    }

    #[test]
    fn clock_set_and_advance() {
        let mut clock = DeterministicClock::new();
        clock.advance(MS_16);
        clock.set(Duration::from_millis(100));
        assert_eq!(clock.now(), Duration::from_millis(100));
        clock.set(Duration::from_millis(50));
        assert_eq!(clock.now(), Duration::from_millis(100));
    }

    #[test]
    fn step_drains_queue_in_order() {
        let mut h = host(&[]);
        h.push_input(down(1));
        h.push_input(down(2));
        h.push_input(ContactInput::Up { id: ContactId(1) });
        assert_eq!(h.pending_inputs(), 3);
        let result = h.step();
        assert_eq!(result.inputs_processed, 3);
        assert_eq!(h.pending_inputs(), 0);
        assert_eq!(h.session().active_count(), 1);
        assert_eq!(h.steps(), 1);
    }

    #[test]
    fn step_fires_timers_up_to_clock() {
        let mut h = host(&[0]);
        h.push_input(down(1));
        h.push_input(down(2));
        h.step();
        h.advance_time(Duration::from_millis(2_000));
        let result = h.step();
        assert_eq!(result.inputs_processed, 0);
        assert!(result.notices.contains(&Notice::WinnerSelected { id: ContactId(1) }));
        assert!(h.session().selection_active());
    }

    #[test]
    fn moves_flush_once_per_step() {
        let mut h = host(&[]);
        h.push_input(down(1));
        h.step();
        for x in 0..5 {
            h.push_input(ContactInput::Move {
                id: ContactId(1),
                position: Position::new(x as f32, 0.0),
            });
        }
        let result = h.step();
        assert_eq!(result.frame_flushed, 1);
        assert_eq!(
            result.notices,
            vec![Notice::MarkerMoved {
                id: ContactId(1),
                position: Position::new(4.0, 0.0)
            }]
        );
    }

    #[test]
    fn rejections_are_reported() {
        let mut h = host(&[0]);
        h.push_input(down(1));
        h.push_input(down(1));
        h.push_input(ContactInput::Down {
            id: ContactId(2),
            position: Position::default(),
            size: Some(SizeHint::new(400.0, 400.0)),
        });
        let result = h.step();
        assert_eq!(
            result.rejected,
            vec![
                (ContactId(1), AddRejection::Duplicate),
                (ContactId(2), AddRejection::PalmRejected),
            ]
        );
    }

    #[test]
    fn mode_rejection_counted_during_selection() {
        let mut h = host(&[0]);
        h.push_input(down(1));
        h.push_input(down(2));
        h.step();
        h.advance_time(Duration::from_millis(2_000));
        h.push_input(ContactInput::SetMode(Mode::CountEntry));
        let result = h.step();
        assert_eq!(result.mode_rejections, 1);
        assert_eq!(h.session().mode(), Mode::ContactPick);
    }

    #[test]
    fn cancel_and_reset_inputs() {
        let mut h = host(&[]);
        h.push_input(down(1));
        h.push_input(down(2));
        h.push_input(ContactInput::Cancel { id: ContactId(2) });
        h.step();
        assert_eq!(h.session().active_count(), 1);
        h.push_input(ContactInput::Reset);
        let result = h.step();
        assert!(result.notices.contains(&Notice::Reset));
        assert_eq!(h.session().active_count(), 0);
    }
}
