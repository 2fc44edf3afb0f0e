#![forbid(unsafe_code)]

//! Live set of input contacts.
//!
//! [`ContactTracker`] keeps contacts in insertion order, enforces the
//! concurrent-contact limit, rejects palm-sized presses, and batches position
//! updates until the next rendering frame. Mode and selection gating are the
//! caller's job; the tracker only knows about contacts.
//!
//! Insertion order decides the presentation slot (marker color) and the
//! order winner resolution snapshots in. It never weights the draw.

/// Opaque identifier of one live contact (a DOM `pointerId` or touch id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(pub u32);

impl core::fmt::Display for ContactId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Surface coordinate in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Reported contact footprint in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeHint {
    pub width: f32,
    pub height: f32,
}

impl SizeHint {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True if either side is larger than `threshold`.
    #[must_use]
    pub fn exceeds(self, threshold: f32) -> bool {
        self.width > threshold || self.height > threshold
    }
}

/// One tracked contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub id: ContactId,
    pub position: Position,
    /// Presentation slot: smallest slot not held by another live contact.
    pub slot: usize,
}

/// Reason a press did not create a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddRejection {
    /// Count-entry mode is showing.
    WrongMode,
    /// A winner is frozen until reset.
    SelectionActive,
    /// The id is already live.
    Duplicate,
    /// The concurrent-contact limit is reached.
    AtCapacity,
    /// The footprint is larger than the palm threshold.
    PalmRejected,
}

impl AddRejection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WrongMode => "wrong_mode",
            Self::SelectionActive => "selection_active",
            Self::Duplicate => "duplicate",
            Self::AtCapacity => "at_capacity",
            Self::PalmRejected => "palm_rejected",
        }
    }
}

/// Insertion-ordered contact set with a capacity limit.
#[derive(Debug, Clone)]
pub struct ContactTracker {
    contacts: Vec<Contact>,
    pending_moves: Vec<(ContactId, Position)>,
    /// Effective limit, never below the tracked count.
    max_contacts: usize,
    /// Limit last asked for; the effective limit settles to it as
    /// contacts are released.
    requested_max: usize,
    palm_rejection_px: f32,
}

impl ContactTracker {
    #[must_use]
    pub fn new(max_contacts: usize, palm_rejection_px: f32) -> Self {
        Self {
            contacts: Vec::with_capacity(max_contacts),
            pending_moves: Vec::new(),
            max_contacts,
            requested_max: max_contacts,
            palm_rejection_px,
        }
    }

    #[must_use]
    pub const fn max_contacts(&self) -> usize {
        self.max_contacts
    }

    /// Limit last passed to [`set_max_contacts`](Self::set_max_contacts).
    #[must_use]
    pub const fn requested_max_contacts(&self) -> usize {
        self.requested_max
    }

    /// Change the limit.
    ///
    /// A limit below the tracked count is deferred: contacts already down
    /// stay, no new ones are accepted, and the effective limit drops with
    /// each release until it reaches the requested value.
    pub fn set_max_contacts(&mut self, max_contacts: usize) {
        self.requested_max = max_contacts;
        self.settle_limit();
    }

    fn settle_limit(&mut self) {
        self.max_contacts = self.requested_max.max(self.contacts.len());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: ContactId) -> bool {
        self.contacts.iter().any(|c| c.id == id)
    }

    #[must_use]
    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    /// Contacts in insertion order.
    #[must_use]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = ContactId> + '_ {
        self.contacts.iter().map(|c| c.id)
    }

    fn free_slot(&self) -> usize {
        (0..)
            .find(|slot| !self.contacts.iter().any(|c| c.slot == *slot))
            .unwrap_or(self.contacts.len())
    }

    /// Track a new contact.
    pub fn add(
        &mut self,
        id: ContactId,
        position: Position,
        size: Option<SizeHint>,
    ) -> Result<Contact, AddRejection> {
        if self.contains(id) {
            return Err(AddRejection::Duplicate);
        }
        if self.contacts.len() >= self.max_contacts {
            return Err(AddRejection::AtCapacity);
        }
        if size.is_some_and(|s| s.exceeds(self.palm_rejection_px)) {
            return Err(AddRejection::PalmRejected);
        }
        let contact = Contact {
            id,
            position,
            slot: self.free_slot(),
        };
        self.contacts.push(contact);
        Ok(contact)
    }

    /// Queue a position for the next frame flush. Later writes replace
    /// earlier ones for the same id.
    ///
    /// Returns `false` for unknown ids.
    pub fn queue_move(&mut self, id: ContactId, position: Position) -> bool {
        if !self.contains(id) {
            return false;
        }
        match self.pending_moves.iter_mut().find(|(pid, _)| *pid == id) {
            Some(pending) => pending.1 = position,
            None => self.pending_moves.push((id, position)),
        }
        true
    }

    #[must_use]
    pub fn has_pending_moves(&self) -> bool {
        !self.pending_moves.is_empty()
    }

    /// Apply queued positions and return them in first-queued order.
    pub fn flush_moves(&mut self) -> Vec<(ContactId, Position)> {
        let moves = std::mem::take(&mut self.pending_moves);
        for (id, position) in &moves {
            if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == *id) {
                contact.position = *position;
            }
        }
        moves
    }

    /// Stop tracking `id`.
    pub fn remove(&mut self, id: ContactId) -> Option<Contact> {
        let idx = self.contacts.iter().position(|c| c.id == id)?;
        self.pending_moves.retain(|(pid, _)| *pid != id);
        let removed = self.contacts.remove(idx);
        self.settle_limit();
        Some(removed)
    }

    /// Keep only `id`; returns the dropped contacts in insertion order.
    pub fn retain_only(&mut self, id: ContactId) -> Vec<Contact> {
        let (kept, dropped): (Vec<_>, Vec<_>) =
            self.contacts.drain(..).partition(|c| c.id == id);
        self.contacts = kept;
        self.pending_moves.retain(|(pid, _)| *pid == id);
        self.settle_limit();
        dropped
    }

    /// Drop everything; returns the dropped contacts in insertion order.
    pub fn clear(&mut self) -> Vec<Contact> {
        self.pending_moves.clear();
        let dropped = std::mem::take(&mut self.contacts);
        self.settle_limit();
        dropped
    }
}
