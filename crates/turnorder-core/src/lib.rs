#![forbid(unsafe_code)]

//! Core: the headless turn-order picker.
//!
//! # Role in turnorder
//! `turnorder-core` owns every decision the picker makes. It has no notion of
//! a DOM, a canvas, or a real clock: hosts feed it contact events and
//! virtual time, and read back [`Notice`]s describing what to draw.
//!
//! # Primary responsibilities
//! - **Session**: mode arbitration, contact tracking, debounced selection,
//!   and reset, bundled in one explicit context object.
//! - **Shuffle**: player-count validation and uniform turn-order generation
//!   for the count-entry mode.
//! - **Randomness**: a secure index source with a logged pseudo-random
//!   fallback, plus deterministic sources for tests and replays.
//! - **Configuration**: timing, limits, and storage key in one validated
//!   struct, loadable from TOML or JSON behind the `config` feature.
//!
//! # How it fits in the system
//! `turnorder-web` wraps a [`Session`] with a deterministic clock, an input
//! queue, and session recording. `turnorder-wasm` binds that host to the
//! browser. Nothing here depends on either.

pub mod config;
pub mod contact;
pub mod logging;
pub mod mode;
pub mod notice;
pub mod random;
pub mod scheduler;
pub mod selection;
pub mod session;
pub mod shuffle;
pub mod timer;

pub use config::{ConfigError, PickerConfig};
pub use contact::{AddRejection, Contact, ContactId, Position, SizeHint};
pub use mode::{
    MemoryModeStore, Mode, ModeParseError, ModeRequestOutcome, ModeStore, NullModeStore,
};
pub use notice::Notice;
pub use random::{RandomSource, ScriptedRandom, SeededRandom, SystemRandom};
pub use selection::{FairnessReport, draw_winner, sample_distribution};
pub use session::{Session, SessionSnapshot};
pub use shuffle::{
    PlayerCountError, format_turn_order, generate_turn_order, parse_player_count,
    shuffle_in_place,
};
