#![forbid(unsafe_code)]

//! Presentation notices emitted by the session for the host to render.
//!
//! The session never calls into a UI. It queues [`Notice`] values in a
//! bounded outbox; a host with markers, animations, and a live region drains
//! and applies them, while a headless run can ignore them.

use std::collections::VecDeque;

use crate::contact::{ContactId, Position};
use crate::logging::TARGET_SESSION;
use crate::mode::Mode;

/// One presentation-relevant change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notice {
    /// Create a marker for a new contact.
    MarkerCreated {
        id: ContactId,
        slot: usize,
        position: Position,
    },
    /// Coalesced marker move, at most one per contact per frame.
    MarkerMoved { id: ContactId, position: Position },
    /// Destroy a marker.
    MarkerRemoved { id: ContactId },
    /// Active contact count changed.
    CountChanged { count: usize },
    /// A press was refused because the surface is full; play a pulse.
    CapacityPulse { id: ContactId },
    /// The interaction mode changed.
    ModeChanged { mode: Mode },
    /// A mode switch was refused because a selection is frozen.
    ModeSwitchRejected { requested: Mode },
    /// Anticipation highlight cycle began.
    AnticipationStarted,
    /// Highlight moved to this contact.
    Highlight { id: ContactId },
    /// Anticipation ended without or before a winner.
    AnticipationStopped,
    /// A winner was drawn.
    WinnerSelected { id: ContactId },
    /// The winner's finger lifted; its marker stays until reset.
    WinnerReleased { id: ContactId },
    /// The session returned to its empty state.
    Reset,
}

impl Notice {
    /// Short machine-readable label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MarkerCreated { .. } => "marker_created",
            Self::MarkerMoved { .. } => "marker_moved",
            Self::MarkerRemoved { .. } => "marker_removed",
            Self::CountChanged { .. } => "count_changed",
            Self::CapacityPulse { .. } => "capacity_pulse",
            Self::ModeChanged { .. } => "mode_changed",
            Self::ModeSwitchRejected { .. } => "mode_switch_rejected",
            Self::AnticipationStarted => "anticipation_started",
            Self::Highlight { .. } => "highlight",
            Self::AnticipationStopped => "anticipation_stopped",
            Self::WinnerSelected { .. } => "winner_selected",
            Self::WinnerReleased { .. } => "winner_released",
            Self::Reset => "reset",
        }
    }
}

/// Bounded FIFO of notices. When full, the oldest notice is dropped.
#[derive(Debug, Clone)]
pub(crate) struct Outbox {
    queue: VecDeque<Notice>,
    capacity: usize,
    dropped: u64,
}

impl Outbox {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub(crate) fn push(&mut self, notice: Notice) {
        if self.queue.len() >= self.capacity {
            self.queue.pop_front();
            self.dropped += 1;
            tracing::trace!(
                target: TARGET_SESSION,
                dropped = self.dropped,
                "notice outbox full, dropping oldest"
            );
        }
        self.queue.push_back(notice);
    }

    pub(crate) fn drain(&mut self) -> Vec<Notice> {
        self.queue.drain(..).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) const fn dropped(&self) -> u64 {
        self.dropped
    }
}
