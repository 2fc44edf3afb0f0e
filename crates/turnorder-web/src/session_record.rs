#![forbid(unsafe_code)]

//! Deterministic session recording and replay.
//!
//! [`SessionRecorder`] drives a seeded [`PickerHost`] and records every
//! input, clock change, and step. After each step it stores an FNV-1a
//! checksum of the [`SessionSnapshot`] plus a running checksum chain.
//! [`replay`] feeds the same records through a fresh host and compares.
//!
//! # Trace layout
//!
//! - **Header**: seed, initial mode, device touch points.
//! - **Input**: a [`ContactInput`] at a timestamp.
//! - **Tick**: the clock set to a timestamp.
//! - **Step**: checkpoint with snapshot checksum and chain.
//! - **Summary**: total steps and final chain.
//!
//! # Determinism contract
//!
//! Same configuration, same trace, same build: identical checksums. Time only
//! moves through tick records and randomness only comes from the seed.

use core::time::Duration;

use turnorder_core::{
    ConfigError, MemoryModeStore, Mode, PickerConfig, SeededRandom, SessionSnapshot,
};

use crate::{ContactInput, PickerHost, StepResult};

/// Schema version for session traces.
pub const SCHEMA_VERSION: &str = "turnorder-trace-v1";

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

fn fnv1a64_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn fnv1a64_u64(hash: u64, v: u64) -> u64 {
    fnv1a64_bytes(hash, &v.to_le_bytes())
}

fn fnv1a64_pair(prev: u64, next: u64) -> u64 {
    let hash = FNV_OFFSET_BASIS;
    let hash = fnv1a64_u64(hash, prev);
    fnv1a64_u64(hash, next)
}

fn hash_contact(hash: u64, id: Option<turnorder_core::ContactId>) -> u64 {
    match id {
        Some(id) => fnv1a64_u64(fnv1a64_bytes(hash, &[1]), u64::from(id.0)),
        None => fnv1a64_bytes(hash, &[0]),
    }
}

/// FNV-1a checksum of the observable session state.
#[must_use]
pub fn checksum_snapshot(snapshot: &SessionSnapshot) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    hash = fnv1a64_u64(hash, snapshot.now.as_nanos() as u64);
    hash = fnv1a64_bytes(hash, snapshot.mode.as_str().as_bytes());
    hash = fnv1a64_bytes(
        hash,
        &[
            u8::from(snapshot.selection_active),
            u8::from(snapshot.winner_marker_retained),
            u8::from(snapshot.armed),
        ],
    );
    hash = hash_contact(hash, snapshot.winner);
    hash = hash_contact(hash, snapshot.highlighted);
    hash = fnv1a64_u64(hash, snapshot.active.len() as u64);
    for id in &snapshot.active {
        hash = fnv1a64_u64(hash, u64::from(id.0));
    }
    hash
}

/// A single record in a session trace.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceRecord {
    /// Session header (must be first).
    Header {
        seed: u64,
        initial_mode: Mode,
        max_touch_points: Option<u32>,
    },
    /// An input queued at a timestamp.
    Input { ts_ns: u64, input: ContactInput },
    /// Clock set to a timestamp.
    Tick { ts_ns: u64 },
    /// Step checkpoint.
    Step {
        step_idx: u64,
        ts_ns: u64,
        checksum: u64,
        checksum_chain: u64,
    },
    /// Trace summary (must be last).
    Summary {
        total_steps: u64,
        final_checksum_chain: u64,
    },
}

/// A complete recorded session trace.
#[derive(Debug, Clone)]
pub struct SessionTrace {
    pub records: Vec<TraceRecord>,
}

impl SessionTrace {
    /// Number of step checkpoints in the trace.
    pub fn step_count(&self) -> u64 {
        self.records
            .iter()
            .filter(|r| matches!(r, TraceRecord::Step { .. }))
            .count() as u64
    }

    /// Final checksum chain from the summary record.
    pub fn final_checksum_chain(&self) -> Option<u64> {
        self.records.iter().rev().find_map(|r| match r {
            TraceRecord::Summary {
                final_checksum_chain,
                ..
            } => Some(*final_checksum_chain),
            _ => None,
        })
    }
}

fn seeded_host(
    config: PickerConfig,
    seed: u64,
    initial_mode: Mode,
    max_touch_points: Option<u32>,
) -> Result<PickerHost<SeededRandom>, ConfigError> {
    let store = MemoryModeStore::with_value(&config.storage_key, initial_mode.as_str());
    let mut host = PickerHost::new(config, Box::new(store), SeededRandom::new(seed))?;
    host.session_mut()
        .set_device_max_touch_points(max_touch_points);
    Ok(host)
}

/// Records a session for deterministic replay.
#[derive(Debug)]
pub struct SessionRecorder {
    host: PickerHost<SeededRandom>,
    records: Vec<TraceRecord>,
    checksum_chain: u64,
    step_idx: u64,
}

impl SessionRecorder {
    /// Create a recorder over a seeded host.
    pub fn new(
        config: PickerConfig,
        seed: u64,
        initial_mode: Mode,
        max_touch_points: Option<u32>,
    ) -> Result<Self, ConfigError> {
        let host = seeded_host(config, seed, initial_mode, max_touch_points)?;
        Ok(Self {
            host,
            records: vec![TraceRecord::Header {
                seed,
                initial_mode,
                max_touch_points,
            }],
            checksum_chain: 0,
            step_idx: 0,
        })
    }

    /// Record an input at the current clock time.
    pub fn push_input(&mut self, input: ContactInput) {
        let ts_ns = self.host.now().as_nanos() as u64;
        self.records.push(TraceRecord::Input {
            ts_ns,
            input: input.clone(),
        });
        self.host.push_input(input);
    }

    /// Record the clock moving to `now`.
    pub fn set_time(&mut self, now: Duration) {
        self.host.set_time(now);
        self.records.push(TraceRecord::Tick {
            ts_ns: self.host.now().as_nanos() as u64,
        });
    }

    /// Record the clock advancing by `dt`.
    pub fn advance_time(&mut self, dt: Duration) {
        let now = self.host.now().saturating_add(dt);
        self.set_time(now);
    }

    /// Step the host and record a checkpoint.
    pub fn step(&mut self) -> StepResult {
        let result = self.host.step();
        let checksum = checksum_snapshot(&self.host.session().snapshot());
        let chain = fnv1a64_pair(self.checksum_chain, checksum);
        self.records.push(TraceRecord::Step {
            step_idx: self.step_idx,
            ts_ns: self.host.now().as_nanos() as u64,
            checksum,
            checksum_chain: chain,
        });
        self.checksum_chain = chain;
        self.step_idx += 1;
        result
    }

    /// Finish recording and return the completed trace.
    pub fn finish(mut self) -> SessionTrace {
        self.records.push(TraceRecord::Summary {
            total_steps: self.step_idx,
            final_checksum_chain: self.checksum_chain,
        });
        SessionTrace {
            records: self.records,
        }
    }

    /// Access the underlying host.
    pub fn host(&self) -> &PickerHost<SeededRandom> {
        &self.host
    }
}

/// Result of replaying a session trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayResult {
    /// Total steps replayed.
    pub total_steps: u64,
    /// Final checksum chain from replay.
    pub final_checksum_chain: u64,
    /// First step where a checksum mismatch was detected, if any.
    pub first_mismatch: Option<ReplayMismatch>,
}

impl ReplayResult {
    /// Whether the replay produced identical checksums.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.first_mismatch.is_none()
    }
}

/// Description of a checksum mismatch during replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayMismatch {
    pub step_idx: u64,
    pub expected: u64,
    pub actual: u64,
}

/// Errors that can occur during replay.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// The trace does not start with a header record.
    MissingHeader,
    /// The configuration handed to replay is invalid.
    Config(ConfigError),
}

impl core::fmt::Display for ReplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingHeader => write!(f, "trace missing header record"),
            Self::Config(e) => write!(f, "config error: {e}"),
        }
    }
}

impl std::error::Error for ReplayError {}

impl From<ConfigError> for ReplayError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Replay a recorded trace through a fresh host built from `config`.
///
/// Inputs and ticks feed the host; each step record triggers a step and a
/// checksum comparison.
pub fn replay(config: PickerConfig, trace: &SessionTrace) -> Result<ReplayResult, ReplayError> {
    let (seed, initial_mode, max_touch_points) = trace
        .records
        .first()
        .and_then(|r| match r {
            TraceRecord::Header {
                seed,
                initial_mode,
                max_touch_points,
            } => Some((*seed, *initial_mode, *max_touch_points)),
            _ => None,
        })
        .ok_or(ReplayError::MissingHeader)?;

    let mut host = seeded_host(config, seed, initial_mode, max_touch_points)?;
    let mut total_steps: u64 = 0;
    let mut checksum_chain: u64 = 0;
    let mut first_mismatch: Option<ReplayMismatch> = None;

    for record in &trace.records {
        match record {
            TraceRecord::Input { input, .. } => host.push_input(input.clone()),
            TraceRecord::Tick { ts_ns } => host.set_time(Duration::from_nanos(*ts_ns)),
            TraceRecord::Step {
                step_idx,
                checksum: expected,
                ..
            } => {
                host.step();
                let actual = checksum_snapshot(&host.session().snapshot());
                checksum_chain = fnv1a64_pair(checksum_chain, actual);
                if actual != *expected && first_mismatch.is_none() {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        target: "turnorder.web",
                        step = *step_idx,
                        expected = *expected,
                        actual,
                        "replay checksum mismatch"
                    );
                    first_mismatch = Some(ReplayMismatch {
                        step_idx: *step_idx,
                        expected: *expected,
                        actual,
                    });
                }
                total_steps += 1;
            }
            TraceRecord::Header { .. } | TraceRecord::Summary { .. } => {}
        }
    }

    Ok(ReplayResult {
        total_steps,
        final_checksum_chain: checksum_chain,
        first_mismatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use turnorder_core::{ContactId, Position};

    fn down(n: u32) -> ContactInput {
        ContactInput::Down {
            id: ContactId(n),
            position: Position::new(n as f32, 0.0),
            size: None,
        }
    }

    fn record_selection(seed: u64) -> SessionTrace {
        let mut rec =
            SessionRecorder::new(PickerConfig::default(), seed, Mode::ContactPick, None).unwrap();
        rec.push_input(down(1));
        rec.push_input(down(2));
        rec.push_input(down(3));
        rec.step();
        for _ in 0..10 {
            rec.advance_time(Duration::from_millis(250));
            rec.step();
        }
        rec.push_input(ContactInput::Reset);
        rec.step();
        rec.finish()
    }

    #[test]
    fn fnv1a64_pair_is_deterministic() {
        assert_eq!(fnv1a64_pair(0, 1234), fnv1a64_pair(0, 1234));
        assert_ne!(fnv1a64_pair(0, 1), fnv1a64_pair(0, 2));
        assert_ne!(fnv1a64_pair(1, 0), fnv1a64_pair(2, 0));
    }

    #[test]
    fn checksum_tracks_winner_and_contacts() {
        let base = SessionSnapshot {
            now: Duration::ZERO,
            mode: Mode::ContactPick,
            selection_active: false,
            winner: None,
            active: vec![ContactId(1), ContactId(2)],
            winner_marker_retained: false,
            armed: true,
            highlighted: None,
        };
        let mut reordered = base.clone();
        reordered.active.reverse();
        let mut won = base.clone();
        won.winner = Some(ContactId(1));
        assert_ne!(checksum_snapshot(&base), checksum_snapshot(&reordered));
        assert_ne!(checksum_snapshot(&base), checksum_snapshot(&won));
        assert_eq!(checksum_snapshot(&base), checksum_snapshot(&base.clone()));
    }

    #[test]
    fn recorder_produces_header_and_summary() {
        let trace = record_selection(42);
        assert!(matches!(
            trace.records[0],
            TraceRecord::Header {
                seed: 42,
                initial_mode: Mode::ContactPick,
                max_touch_points: None,
            }
        ));
        assert_eq!(trace.step_count(), 12);
        assert!(matches!(
            trace.records.last(),
            Some(TraceRecord::Summary { total_steps: 12, .. })
        ));
    }

    #[test]
    fn replay_matches_recording() {
        for seed in [0, 1, 42, u64::MAX] {
            let trace = record_selection(seed);
            let result = replay(PickerConfig::default(), &trace).unwrap();
            assert!(result.ok(), "seed {seed}: {:?}", result.first_mismatch);
            assert_eq!(result.total_steps, trace.step_count());
            assert_eq!(Some(result.final_checksum_chain), trace.final_checksum_chain());
        }
    }

    #[test]
    fn replay_detects_different_config() {
        let trace = record_selection(7);
        let slower = PickerConfig {
            auto_select_delay_ms: 5_000,
            ..PickerConfig::default()
        };
        let result = replay(slower, &trace).unwrap();
        assert!(!result.ok());
    }

    #[test]
    fn replay_requires_header() {
        let trace = SessionTrace {
            records: vec![TraceRecord::Tick { ts_ns: 0 }],
        };
        assert_eq!(
            replay(PickerConfig::default(), &trace),
            Err(ReplayError::MissingHeader)
        );
    }
}
