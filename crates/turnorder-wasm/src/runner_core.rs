#![forbid(unsafe_code)]

//! Platform-independent runner core behind the `wasm-bindgen` exports.
//!
//! Holds the picker host for contact-pick mode and the form state for
//! count-entry mode. No JS/WASM types here, so native tests drive it
//! directly.

use core::time::Duration;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

use turnorder_core::config::DEFAULT_MAX_PLAYERS;
use turnorder_core::{
    ConfigError, ContactId, Mode, ModeRequestOutcome, ModeStore, Notice, PickerConfig,
    PlayerCountError, Position, RandomSource, SizeHint, SystemRandom, format_turn_order,
    generate_turn_order, parse_player_count, sample_distribution,
};
use turnorder_web::input_parser::parse_encoded_input;
use turnorder_web::{ContactInput, PickerHost, StepResult};

/// Live-validation state of the player-count field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountInputState {
    /// Message to show under the field, if the text is not a valid count.
    pub error: Option<PlayerCountError>,
    /// Whether the generate control should be enabled.
    pub generate_enabled: bool,
}

/// Platform-independent runner: picker host plus count-entry form.
pub struct RunnerCore {
    host: PickerHost<Box<dyn RandomSource>>,
    shuffle_rng: Box<dyn RandomSource>,
    min_players: u32,
    max_players: u32,
    count_text: String,
    last_valid_count: Option<u32>,
    last_order: Vec<u32>,
    /// Notices accumulated since the host last took them.
    notices: Vec<Notice>,
    /// Screen-reader announcements, oldest first.
    announcements: VecDeque<String>,
    /// Structured host diagnostics (`runner_*` lines).
    logs: Vec<String>,
}

impl core::fmt::Debug for RunnerCore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunnerCore")
            .field("host", &self.host)
            .field("count_text", &self.count_text)
            .field("last_valid_count", &self.last_valid_count)
            .field("pending_notices", &self.notices.len())
            .finish()
    }
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
impl RunnerCore {
    /// Runner with system randomness for both winner draws and shuffles.
    pub fn new(config: PickerConfig, store: Box<dyn ModeStore>) -> Result<Self, ConfigError> {
        Self::with_random(
            config,
            store,
            Box::new(SystemRandom::new()),
            Box::new(SystemRandom::new()),
        )
    }

    /// Runner with injected random sources.
    pub fn with_random(
        config: PickerConfig,
        store: Box<dyn ModeStore>,
        pick_rng: Box<dyn RandomSource>,
        shuffle_rng: Box<dyn RandomSource>,
    ) -> Result<Self, ConfigError> {
        let min_players = config.min_players;
        let max_players = config.max_players;
        Ok(Self {
            host: PickerHost::new(config, store, pick_rng)?,
            shuffle_rng,
            min_players,
            max_players,
            count_text: String::new(),
            last_valid_count: None,
            last_order: Vec::new(),
            notices: Vec::new(),
            announcements: VecDeque::new(),
            logs: Vec::new(),
        })
    }

    // ── Clock ──────────────────────────────────────────────────────────

    /// Advance the deterministic clock by `dt_ms` milliseconds.
    pub fn advance_time_ms(&mut self, dt_ms: f64) {
        // Host frame deltas can be NaN or negative after tab suspension.
        if !dt_ms.is_finite() || dt_ms <= 0.0 {
            return;
        }
        let secs = (dt_ms / 1000.0).min(Duration::MAX.as_secs_f64());
        let dt = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        self.host.advance_time(dt);
    }

    /// Set the deterministic clock to absolute milliseconds
    /// (`performance.now()`).
    pub fn set_time_ms(&mut self, ts_ms: f64) {
        let nanos = if !ts_ms.is_finite() || ts_ms <= 0.0 {
            0
        } else {
            (ts_ms * 1_000_000.0).min(u64::MAX as f64) as u64
        };
        self.host.set_time(Duration::from_nanos(nanos));
    }

    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.host.now().as_secs_f64() * 1000.0
    }

    // ── Contact input ──────────────────────────────────────────────────

    /// Parse a JSON-encoded input and queue it.
    ///
    /// Returns `false` if it was malformed or had no mapping.
    pub fn push_encoded_input(&mut self, json: &str) -> bool {
        match parse_encoded_input(json) {
            Ok(Some(input)) => {
                self.host.push_input(input);
                true
            }
            Ok(None) => false,
            Err(err) => {
                self.logs.push(format!("runner_input_error: {err}"));
                false
            }
        }
    }

    /// Queue a pointer press. Non-positive or non-finite sizes mean
    /// "not reported".
    pub fn pointer_down(&mut self, id: u32, x: f32, y: f32, width: f32, height: f32) {
        let size = (width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0)
            .then(|| SizeHint::new(width, height));
        self.host.push_input(ContactInput::Down {
            id: ContactId(id),
            position: Position::new(x, y),
            size,
        });
    }

    pub fn pointer_move(&mut self, id: u32, x: f32, y: f32) {
        self.host.push_input(ContactInput::Move {
            id: ContactId(id),
            position: Position::new(x, y),
        });
    }

    pub fn pointer_up(&mut self, id: u32) {
        self.host.push_input(ContactInput::Up { id: ContactId(id) });
    }

    pub fn pointer_cancel(&mut self, id: u32) {
        self.host.push_input(ContactInput::Cancel { id: ContactId(id) });
    }

    /// Apply the device-reported touch capability.
    pub fn set_device_max_touch_points(&mut self, points: Option<u32>) {
        self.host
            .session_mut()
            .set_device_max_touch_points(points);
    }

    /// Apply queued input, fire timers, flush the frame.
    pub fn step(&mut self) -> StepResult {
        let result = self.host.step();
        for (id, reason) in &result.rejected {
            self.logs
                .push(format!("runner_contact_ignored: id={} reason={}", id.0, reason.as_str()));
        }
        self.notices.extend(result.notices.iter().copied());
        result
    }

    /// Take notices accumulated by steps and direct calls.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.extend(self.host.drain_notices());
        std::mem::take(&mut self.notices)
    }

    // ── Mode & reset ───────────────────────────────────────────────────

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.host.session().mode()
    }

    /// Request a mode by name. Returns `true` if the runner is now in it.
    pub fn request_mode(&mut self, name: &str) -> bool {
        let Ok(mode) = name.parse::<Mode>() else {
            self.logs.push(format!("runner_unknown_mode: {name}"));
            return false;
        };
        let outcome = self.host.session_mut().request_mode(mode);
        self.notices.extend(self.host.drain_notices());
        !matches!(outcome, ModeRequestOutcome::RejectedDuringSelection)
    }

    /// Reset the contact-pick session.
    pub fn reset(&mut self) {
        self.host.session_mut().reset();
        self.notices.extend(self.host.drain_notices());
    }

    #[must_use]
    pub fn selection_active(&self) -> bool {
        self.host.session().selection_active()
    }

    #[must_use]
    pub fn winner(&self) -> Option<u32> {
        self.host.session().winner().map(|id| id.0)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.host.session().active_count()
    }

    /// Test hook forwarded to the session.
    pub fn force_selection_active(&mut self, active: bool) -> bool {
        let applied = self.host.session_mut().force_selection_active(active);
        self.notices.extend(self.host.drain_notices());
        applied
    }

    // ── Count entry ────────────────────────────────────────────────────

    /// Live-validate the player-count field.
    ///
    /// Invalid text queues its error message as an announcement.
    pub fn set_count_input(&mut self, text: &str) -> CountInputState {
        self.count_text = text.to_owned();
        match parse_player_count(text, self.min_players, self.max_players) {
            Ok(_) => CountInputState {
                error: None,
                generate_enabled: true,
            },
            Err(err) => {
                self.announcements.push_back(err.to_string());
                CountInputState {
                    error: Some(err),
                    generate_enabled: false,
                }
            }
        }
    }

    /// Generate a turn order from the current field text.
    ///
    /// On success remembers the count and announces the order.
    pub fn generate(&mut self) -> Result<Vec<u32>, PlayerCountError> {
        let count = match parse_player_count(&self.count_text, self.min_players, self.max_players)
        {
            Ok(count) => count,
            Err(err) => {
                self.announcements.push_back(err.to_string());
                return Err(err);
            }
        };
        let order = generate_turn_order(count, &mut self.shuffle_rng);
        self.last_valid_count = Some(count);
        self.announcements
            .push_back(format!("Turn order generated: {}", format_turn_order(&order)));
        self.last_order = order.clone();
        Ok(order)
    }

    #[must_use]
    pub const fn last_valid_count(&self) -> Option<u32> {
        self.last_valid_count
    }

    /// Last generated order formatted for display (`"3, 1, 2"`).
    #[must_use]
    pub fn formatted_order(&self) -> String {
        format_turn_order(&self.last_order)
    }

    /// Take pending announcements, oldest first.
    pub fn take_announcements(&mut self) -> Vec<String> {
        self.announcements.drain(..).collect()
    }

    /// Take runner diagnostics.
    pub fn take_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.logs)
    }
}

/// Largest player count or candidate count the free exports accept.
pub const FREE_EXPORT_LIMIT: u32 = DEFAULT_MAX_PLAYERS;

/// Shuffled `[1..=n]`, or empty when `n` exceeds [`FREE_EXPORT_LIMIT`].
pub fn bounded_turn_order<R: RandomSource + ?Sized>(n: u32, rng: &mut R) -> Vec<u32> {
    if n > FREE_EXPORT_LIMIT {
        return Vec::new();
    }
    generate_turn_order(n, rng)
}

/// Per-index hit counts of `samples` draws over `candidates` indices.
///
/// Empty when `candidates` is zero or exceeds [`FREE_EXPORT_LIMIT`].
pub fn bounded_fairness_counts<R: RandomSource + ?Sized>(
    rng: &mut R,
    candidates: u32,
    samples: u32,
) -> Vec<u32> {
    if candidates > FREE_EXPORT_LIMIT {
        return Vec::new();
    }
    let Some(candidates) = NonZeroUsize::new(candidates as usize) else {
        return Vec::new();
    };
    sample_distribution(rng, candidates, samples as usize)
        .counts
        .into_iter()
        .map(|c| c as u32)
        .collect()
}
