#![forbid(unsafe_code)]

//! Interaction-mode arbitration and persistence of the last used mode.
//!
//! The controller is a two-state selector. Switching is refused while a
//! selection is frozen; the last non-selecting mode is written through a
//! [`ModeStore`] whenever selection ends or the user switches.

use std::collections::HashMap;

use crate::logging::TARGET_MODE;

/// Exclusive interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Type a player count and get a shuffled order.
    #[default]
    CountEntry,
    /// Place fingers on the surface and let one be picked.
    ContactPick,
}

impl Mode {
    /// Stable name used for persistence and host messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CountEntry => "count-entry",
            Self::ContactPick => "contact-pick",
        }
    }

    /// The other mode.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::CountEntry => Self::ContactPick,
            Self::ContactPick => Self::CountEntry,
        }
    }
}

impl core::fmt::Display for Mode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "count-entry" => Ok(Self::CountEntry),
            "contact-pick" => Ok(Self::ContactPick),
            other => Err(ModeParseError(other.to_owned())),
        }
    }
}

/// Unknown mode name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeParseError(pub String);

impl core::fmt::Display for ModeParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown mode: {:?}", self.0)
    }
}

impl std::error::Error for ModeParseError {}

/// String key/value store for the persisted mode.
///
/// Hosts back this with `localStorage`; tests and headless runs use
/// [`MemoryModeStore`]. Store failures are swallowed by implementations.
pub trait ModeStore {
    fn load(&self, key: &str) -> Option<String>;
    fn store(&mut self, key: &str, value: &str);
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryModeStore {
    values: HashMap<String, String>,
    writes: usize,
}

impl MemoryModeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one value.
    #[must_use]
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut store = Self::new();
        store.values.insert(key.to_owned(), value.to_owned());
        store
    }

    /// Number of writes since construction.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl ModeStore for MemoryModeStore {
    fn load(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn store(&mut self, key: &str, value: &str) {
        self.writes += 1;
        self.values.insert(key.to_owned(), value.to_owned());
    }
}

/// Store that remembers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullModeStore;

impl ModeStore for NullModeStore {
    fn load(&self, _key: &str) -> Option<String> {
        None
    }

    fn store(&mut self, _key: &str, _value: &str) {}
}

/// Result of [`ModeController::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequestOutcome {
    /// Already in the requested mode.
    Unchanged,
    /// Mode switched.
    Switched { from: Mode, to: Mode },
    /// A selection is frozen; the switch was refused.
    RejectedDuringSelection,
}

/// Two-state mode selector gated by the selection flag.
pub struct ModeController {
    current: Mode,
    selection_active: bool,
    storage_key: String,
    store: Box<dyn ModeStore>,
}

impl core::fmt::Debug for ModeController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModeController")
            .field("current", &self.current)
            .field("selection_active", &self.selection_active)
            .field("storage_key", &self.storage_key)
            .finish()
    }
}

impl ModeController {
    /// Restore the last persisted mode, defaulting to count-entry.
    pub fn restore(storage_key: impl Into<String>, store: Box<dyn ModeStore>) -> Self {
        let storage_key = storage_key.into();
        let current = match store.load(&storage_key) {
            Some(raw) => raw.parse().unwrap_or_else(|err: ModeParseError| {
                tracing::debug!(
                    target: TARGET_MODE,
                    error = %err,
                    "ignoring persisted mode"
                );
                Mode::default()
            }),
            None => Mode::default(),
        };
        Self {
            current,
            selection_active: false,
            storage_key,
            store,
        }
    }

    #[must_use]
    pub const fn current(&self) -> Mode {
        self.current
    }

    #[must_use]
    pub const fn selection_active(&self) -> bool {
        self.selection_active
    }

    /// Ask to switch to `target`.
    pub fn request(&mut self, target: Mode) -> ModeRequestOutcome {
        if target == self.current {
            return ModeRequestOutcome::Unchanged;
        }
        if self.selection_active {
            tracing::debug!(
                target: TARGET_MODE,
                requested = %target,
                "mode switch refused during selection"
            );
            return ModeRequestOutcome::RejectedDuringSelection;
        }
        let from = self.current;
        self.current = target;
        self.persist();
        tracing::info!(target: TARGET_MODE, from = %from, to = %target, "mode switched");
        ModeRequestOutcome::Switched { from, to: target }
    }

    /// Flip the selection gate; leaving selection persists the mode.
    pub fn set_selection_active(&mut self, active: bool) {
        let was_active = self.selection_active;
        self.selection_active = active;
        if was_active && !active {
            self.persist();
        }
    }

    fn persist(&mut self) {
        if self.selection_active {
            return;
        }
        self.store.store(&self.storage_key, self.current.as_str());
    }

    /// Direct read of the store, mostly for inspection.
    #[must_use]
    pub fn persisted(&self) -> Option<String> {
        self.store.load(&self.storage_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "turnorder.lastMode";

    #[test]
    fn restore_defaults_to_count_entry() {
        let ctl = ModeController::restore(KEY, Box::new(MemoryModeStore::new()));
        assert_eq!(ctl.current(), Mode::CountEntry);
    }

    #[test]
    fn restore_reads_valid_value() {
        let store = MemoryModeStore::with_value(KEY, "contact-pick");
        let ctl = ModeController::restore(KEY, Box::new(store));
        assert_eq!(ctl.current(), Mode::ContactPick);
    }

    #[test]
    fn restore_ignores_garbage() {
        let store = MemoryModeStore::with_value(KEY, "touch???");
        let ctl = ModeController::restore(KEY, Box::new(store));
        assert_eq!(ctl.current(), Mode::CountEntry);
    }

    #[test]
    fn request_same_mode_is_noop() {
        let mut ctl = ModeController::restore(KEY, Box::new(MemoryModeStore::new()));
        assert_eq!(ctl.request(Mode::CountEntry), ModeRequestOutcome::Unchanged);
        assert_eq!(ctl.persisted(), None);
    }

    #[test]
    fn request_switches_and_persists() {
        let mut ctl = ModeController::restore(KEY, Box::new(MemoryModeStore::new()));
        assert_eq!(
            ctl.request(Mode::ContactPick),
            ModeRequestOutcome::Switched {
                from: Mode::CountEntry,
                to: Mode::ContactPick
            }
        );
        assert_eq!(ctl.persisted().as_deref(), Some("contact-pick"));
    }

    #[test]
    fn request_rejected_while_selection_active() {
        let mut ctl = ModeController::restore(KEY, Box::new(MemoryModeStore::new()));
        ctl.request(Mode::ContactPick);
        ctl.set_selection_active(true);
        assert_eq!(
            ctl.request(Mode::CountEntry),
            ModeRequestOutcome::RejectedDuringSelection
        );
        assert_eq!(ctl.current(), Mode::ContactPick);
    }

    #[test]
    fn leaving_selection_persists_current() {
        let store = MemoryModeStore::with_value(KEY, "count-entry");
        let mut ctl = ModeController::restore(KEY, Box::new(store));
        ctl.current = Mode::ContactPick;
        ctl.set_selection_active(true);
        assert_eq!(ctl.persisted().as_deref(), Some("count-entry"));
        ctl.set_selection_active(false);
        assert_eq!(ctl.persisted().as_deref(), Some("contact-pick"));
    }

    #[test]
    fn mode_names_round_trip_through_from_str() {
        for mode in [Mode::CountEntry, Mode::ContactPick] {
            assert_eq!(mode.as_str().parse::<Mode>(), Ok(mode));
            assert_eq!(mode.other().other(), mode);
        }
        assert!("nope".parse::<Mode>().is_err());
    }
}
