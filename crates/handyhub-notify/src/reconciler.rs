//! Per-entry optimistic state machine over remote notification truth.
//!
//! Each entry keeps the latest remote record plus a [`LocalState`]:
//!
//! ```text
//! Synced ──begin_mark_read──▶ ReadPending ──confirm/rollback──▶ Synced
//! Synced | ReadPending ──begin_delete──▶ DeletePending ──confirm──▶ (removed)
//!                                                     └─rollback─▶ Synced | ReadPending
//! ```
//!
//! Remote writes are ordered per id by `Notification::version`. A delete
//! leaves a tombstone so a late, older insert cannot bring the row back; a
//! delete this client confirmed itself is terminal for the id. Tombstones
//! are bounded: once [`NotificationReconciler::DEFAULT_TOMBSTONE_LIMIT`] ids
//! are remembered the oldest is forgotten.
//! Entries pending deletion stay in the list (hidden), which is what lets a
//! rollback restore them at their original position.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use handyhub_core::{Notification, NotificationStatus, RemoteEvent, RemoteEventKind};
use uuid::Uuid;

use crate::view::{filtered_sorted_view, ViewFilter};

/// Identifies one optimistic mutation until it is confirmed or rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    MarkRead,
    Delete,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::MarkRead => write!(f, "mark read"),
            MutationKind::Delete => write!(f, "delete"),
        }
    }
}

/// What [`NotificationReconciler::apply_remote`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted,
    Updated,
    Removed,
    /// Older than (or equal to) what is already known for the id.
    Stale,
    /// A delete for an id not in the view.
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
enum LocalState {
    Synced,
    ReadPending { op: OpId, read_at: DateTime<Utc> },
    DeletePending { op: OpId },
}

impl LocalState {
    fn op(&self) -> Option<OpId> {
        match self {
            LocalState::Synced => None,
            LocalState::ReadPending { op, .. } | LocalState::DeletePending { op } => Some(*op),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    remote: Notification,
    local: LocalState,
}

impl Entry {
    fn synced(remote: Notification) -> Self {
        Self {
            remote,
            local: LocalState::Synced,
        }
    }

    fn is_visible(&self) -> bool {
        !matches!(self.local, LocalState::DeletePending { .. })
    }

    fn displayed(&self) -> Option<Notification> {
        match &self.local {
            LocalState::Synced => Some(self.remote.clone()),
            LocalState::ReadPending { read_at, .. } => {
                let mut shown = self.remote.clone();
                if shown.is_unread() {
                    shown.status = NotificationStatus::Read;
                    shown.read_at = Some(*read_at);
                }
                Some(shown)
            }
            LocalState::DeletePending { .. } => None,
        }
    }

    fn displayed_unread(&self) -> bool {
        matches!(self.local, LocalState::Synced) && self.remote.is_unread()
    }
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: Uuid,
    kind: MutationKind,
    read_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct NotificationReconciler {
    /// Ordered newest first by `created_at`.
    entries: Vec<Entry>,
    /// Highest version seen in a delete, per id.
    tombstones: HashMap<Uuid, i64>,
    /// Tombstoned ids, oldest first.
    tombstone_order: VecDeque<Uuid>,
    tombstone_limit: usize,
    in_flight: HashMap<OpId, InFlight>,
    next_op: u64,
}

impl Default for NotificationReconciler {
    fn default() -> Self {
        Self::with_tombstone_limit(Self::DEFAULT_TOMBSTONE_LIMIT)
    }
}

impl NotificationReconciler {
    pub const DEFAULT_TOMBSTONE_LIMIT: usize = 4096;

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A reconciler remembering at most `limit` deleted ids (at least one).
    #[must_use]
    pub fn with_tombstone_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            tombstones: HashMap::new(),
            tombstone_order: VecDeque::new(),
            tombstone_limit: limit.max(1),
            in_flight: HashMap::new(),
            next_op: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Remote truth
    // -----------------------------------------------------------------------

    /// Apply one change-feed event.
    ///
    /// Inserts and updates are upserts by id and win only with a version
    /// strictly newer than both the current entry and any tombstone. Deletes
    /// remove the entry whatever its local state, unless they are older than
    /// the entry.
    pub fn apply_remote(&mut self, event: RemoteEvent) -> ApplyOutcome {
        let RemoteEvent { kind, notification } = event;
        let id = notification.id;
        let version = notification.version;

        let outcome = match kind {
            RemoteEventKind::Delete => self.apply_delete(id, version),
            RemoteEventKind::Insert | RemoteEventKind::Update => self.upsert(notification),
        };

        if outcome == ApplyOutcome::Stale {
            tracing::warn!(%id, version, ?kind, "ignoring stale notification event");
        } else {
            tracing::debug!(%id, version, ?kind, ?outcome, "applied notification event");
        }
        outcome
    }

    /// Replace the view with an authoritative page fetch.
    ///
    /// Rows obey the same version rule as events. Entries missing from the
    /// page are dropped unless a local mutation is still pending on them.
    pub fn replace_with_page(&mut self, rows: Vec<Notification>) {
        let mut previous: HashMap<Uuid, Entry> = self
            .entries
            .drain(..)
            .map(|e| (e.remote.id, e))
            .collect();
        let mut seen = HashSet::new();
        let mut fresh = Vec::with_capacity(rows.len());

        for row in rows {
            if !seen.insert(row.id) || self.is_tombstoned(row.id, row.version) {
                continue;
            }
            match previous.remove(&row.id) {
                Some(mut entry) => {
                    if row.version >= entry.remote.version {
                        entry.remote = row;
                    }
                    fresh.push(entry);
                }
                None => fresh.push(Entry::synced(row)),
            }
        }

        self.entries = fresh;
        let mut kept_pending = 0usize;
        for entry in previous.into_values() {
            if entry.local != LocalState::Synced {
                self.insert_ordered(entry);
                kept_pending += 1;
            }
        }

        tracing::debug!(
            entries = self.entries.len(),
            kept_pending,
            "replaced notification view from fetch"
        );
    }

    fn apply_delete(&mut self, id: Uuid, version: i64) -> ApplyOutcome {
        self.raise_tombstone(id, version);

        match self.position(id) {
            Some(idx) if version >= self.entries[idx].remote.version => {
                self.entries.remove(idx);
                ApplyOutcome::Removed
            }
            Some(_) => ApplyOutcome::Stale,
            None => ApplyOutcome::Absent,
        }
    }

    fn upsert(&mut self, notification: Notification) -> ApplyOutcome {
        if self.is_tombstoned(notification.id, notification.version) {
            return ApplyOutcome::Stale;
        }

        match self.position(notification.id) {
            Some(idx) => {
                let entry = &mut self.entries[idx];
                if notification.version <= entry.remote.version {
                    return ApplyOutcome::Stale;
                }
                entry.remote = notification;
                ApplyOutcome::Updated
            }
            None => {
                self.insert_ordered(Entry::synced(notification));
                ApplyOutcome::Inserted
            }
        }
    }

    fn raise_tombstone(&mut self, id: Uuid, version: i64) {
        if let Some(tombstone) = self.tombstones.get_mut(&id) {
            *tombstone = (*tombstone).max(version);
            return;
        }
        self.tombstones.insert(id, version);
        self.tombstone_order.push_back(id);
        while self.tombstone_order.len() > self.tombstone_limit {
            if let Some(oldest) = self.tombstone_order.pop_front() {
                self.tombstones.remove(&oldest);
            }
        }
    }

    /// Number of deleted ids currently remembered.
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.tombstones.len()
    }

    fn is_tombstoned(&self, id: Uuid, version: i64) -> bool {
        self.tombstones.get(&id).is_some_and(|&t| version <= t)
    }

    fn insert_ordered(&mut self, entry: Entry) {
        let idx = self
            .entries
            .iter()
            .position(|e| e.remote.created_at < entry.remote.created_at)
            .unwrap_or(self.entries.len());
        self.entries.insert(idx, entry);
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|e| e.remote.id == id)
    }

    // -----------------------------------------------------------------------
    // Local optimistic mutations
    // -----------------------------------------------------------------------

    /// Optimistically mark `id` read.
    ///
    /// Returns `None` (and changes nothing) when the id is not shown or is
    /// already read: there is nothing to confirm.
    pub fn begin_mark_read(&mut self, id: Uuid, read_at: DateTime<Utc>) -> Option<OpId> {
        let idx = self.position(id)?;
        if !self.entries[idx].displayed_unread() {
            return None;
        }
        let op = self.allocate(InFlight {
            id,
            kind: MutationKind::MarkRead,
            read_at: Some(read_at),
        });
        self.entries[idx].local = LocalState::ReadPending { op, read_at };
        Some(op)
    }

    /// Optimistically mark every displayed unread entry read, one op each.
    pub fn begin_mark_all_read(&mut self, read_at: DateTime<Utc>) -> Vec<(Uuid, OpId)> {
        let ids: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|e| e.displayed_unread())
            .map(|e| e.remote.id)
            .collect();

        ids.into_iter()
            .filter_map(|id| self.begin_mark_read(id, read_at).map(|op| (id, op)))
            .collect()
    }

    /// Optimistically hide `id`. `None` when it is not shown.
    pub fn begin_delete(&mut self, id: Uuid) -> Option<OpId> {
        let idx = self.position(id)?;
        if !self.entries[idx].is_visible() {
            return None;
        }
        let op = self.allocate(InFlight {
            id,
            kind: MutationKind::Delete,
            read_at: None,
        });
        self.entries[idx].local = LocalState::DeletePending { op };
        Some(op)
    }

    /// Optimistically hide several entries, one op each. Unknown ids are skipped.
    pub fn begin_delete_many(&mut self, ids: &[Uuid]) -> Vec<(Uuid, OpId)> {
        ids.iter()
            .filter_map(|&id| self.begin_delete(id).map(|op| (id, op)))
            .collect()
    }

    /// The store accepted `op`. Returns `false` for an unknown op.
    ///
    /// The accepted change becomes part of the remote record even if a newer
    /// local op has since superseded it.
    pub fn confirm(&mut self, op: OpId) -> bool {
        self.confirm_with_version(op, None)
    }

    /// Like [`Self::confirm`], with the row version the store reported for
    /// the write. A mark-read carrying it moves the entry's remote version
    /// forward, so a fetch or event older than the write cannot undo it.
    pub fn confirm_with_version(&mut self, op: OpId, stored_version: Option<i64>) -> bool {
        let Some(flight) = self.in_flight.remove(&op) else {
            return false;
        };
        let Some(idx) = self.position(flight.id) else {
            tracing::debug!(id = %flight.id, "confirmed op for an entry no longer in view");
            if flight.kind == MutationKind::Delete {
                self.raise_tombstone(flight.id, i64::MAX);
            }
            return true;
        };

        match flight.kind {
            MutationKind::MarkRead => {
                let entry = &mut self.entries[idx];
                if entry.remote.is_unread() {
                    entry.remote.status = NotificationStatus::Read;
                    entry.remote.read_at = flight.read_at;
                }
                if let Some(version) = stored_version {
                    entry.remote.version = entry.remote.version.max(version);
                }
                if entry.local.op() == Some(op) {
                    entry.local = LocalState::Synced;
                }
            }
            MutationKind::Delete => {
                // the row is gone from the store and ids are never reused
                self.entries.remove(idx);
                self.raise_tombstone(flight.id, i64::MAX);
                self.in_flight.retain(|_, f| f.id != flight.id);
            }
        }
        true
    }

    /// The store rejected `op`: restore what was shown before it. Returns
    /// `false` for an unknown op.
    ///
    /// A delete rollback reveals the entry at its original position, still
    /// showing any mark-read that is in flight for it.
    pub fn rollback(&mut self, op: OpId) -> bool {
        let Some(flight) = self.in_flight.remove(&op) else {
            return false;
        };
        let Some(idx) = self.position(flight.id) else {
            return true;
        };
        if self.entries[idx].local.op() != Some(op) {
            // superseded; the newer op decides what is shown
            return true;
        }

        let pending_read = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.id == flight.id && f.kind == MutationKind::MarkRead)
            .max_by_key(|(op, _)| **op)
            .and_then(|(op, f)| f.read_at.map(|read_at| (*op, read_at)));

        self.entries[idx].local = match (flight.kind, pending_read) {
            (MutationKind::Delete, Some((op, read_at))) => LocalState::ReadPending { op, read_at },
            _ => LocalState::Synced,
        };
        tracing::warn!(id = %flight.id, kind = %flight.kind, "rolled back optimistic change");
        true
    }

    fn allocate(&mut self, flight: InFlight) -> OpId {
        self.next_op += 1;
        let op = OpId(self.next_op);
        self.in_flight.insert(op, flight);
        op
    }

    // -----------------------------------------------------------------------
    // Projections
    // -----------------------------------------------------------------------

    /// What the UI should show, newest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries.iter().filter_map(Entry::displayed).collect()
    }

    /// Search/filter/sort projection over the displayed entries.
    #[must_use]
    pub fn view(&self, filter: &ViewFilter) -> Vec<Notification> {
        filtered_sorted_view(self.entries.iter().filter_map(Entry::displayed), filter)
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Notification> {
        self.entries
            .iter()
            .find(|e| e.remote.id == id)
            .and_then(Entry::displayed)
    }

    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|e| e.displayed_unread()).count()
    }

    /// Number of displayed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_visible()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn has_pending(&self, id: Uuid) -> bool {
        self.in_flight.values().any(|f| f.id == id)
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
