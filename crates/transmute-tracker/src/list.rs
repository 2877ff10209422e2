//! Completed-conversion list and its reconciliation rules.
//!
//! The list is only replaced wholesale (by a refresh) or shrunk by one entry
//! (by a confirmed delete). Refreshes are stamped with a ticket when issued;
//! a response whose ticket is not newer than the last applied one is dropped,
//! and ids deleted after a refresh was issued are filtered out of its result.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use transmute_core::models::FileRecord;

/// Fetch-cycle state of the tracked list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ListPhase {
    /// No refresh has been issued yet.
    Idle,
    Loading,
    Loaded,
    Errored(String),
}

impl ListPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, ListPhase::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ListPhase::Errored(message) => Some(message),
            _ => None,
        }
    }
}

/// What happened to a refresh response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The response replaced the list.
    Applied { ticket: u64, len: usize },
    /// A newer refresh had already been applied; the response was discarded.
    Superseded { ticket: u64, applied: u64 },
}

#[derive(Debug)]
pub(crate) struct ListState {
    records: Arc<[FileRecord]>,
    phase: ListPhase,
    issued: u64,
    applied: u64,
    /// Tickets issued but neither settled nor abandoned.
    outstanding: BTreeSet<u64>,
    /// Phase of the last settled refresh, restored once nothing newer is
    /// outstanding.
    settled: ListPhase,
    /// Confirmed deletes, keyed by id, holding the newest ticket issued at
    /// confirmation time. Only a successful refresh issued after the
    /// confirmation prunes an entry; failed refreshes leave them in place.
    tombstones: HashMap<String, u64>,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            records: Arc::from(Vec::new()),
            phase: ListPhase::Idle,
            issued: 0,
            applied: 0,
            outstanding: BTreeSet::new(),
            settled: ListPhase::Idle,
            tombstones: HashMap::new(),
        }
    }
}

impl ListState {
    pub(crate) fn records(&self) -> Arc<[FileRecord]> {
        Arc::clone(&self.records)
    }

    pub(crate) fn phase(&self) -> &ListPhase {
        &self.phase
    }

    /// Stamp a new refresh and enter `Loading`.
    pub(crate) fn begin_refresh(&mut self) -> u64 {
        self.issued += 1;
        self.outstanding.insert(self.issued);
        self.phase = ListPhase::Loading;
        self.issued
    }

    fn is_stale(&self, ticket: u64) -> bool {
        ticket <= self.applied
    }

    /// Drop `ticket` from the outstanding set and recompute the phase: the
    /// list stays loading while any refresh newer than the applied one is
    /// still outstanding.
    fn finish(&mut self, ticket: u64) {
        self.outstanding.remove(&ticket);
        let applied = self.applied;
        self.phase = if self.outstanding.iter().any(|&t| t > applied) {
            ListPhase::Loading
        } else {
            self.settled.clone()
        };
    }

    /// Forget a refresh whose response will never arrive (its future was
    /// dropped). Returns `false` if the ticket had already settled.
    pub(crate) fn abandon_refresh(&mut self, ticket: u64) -> bool {
        if !self.outstanding.contains(&ticket) {
            return false;
        }
        self.finish(ticket);
        true
    }

    pub(crate) fn apply_refresh(&mut self, ticket: u64, fetched: Vec<FileRecord>) -> RefreshOutcome {
        if self.is_stale(ticket) {
            self.finish(ticket);
            return RefreshOutcome::Superseded {
                ticket,
                applied: self.applied,
            };
        }

        let tombstones = &self.tombstones;
        let fetched = fetched
            .into_iter()
            .filter(|r| tombstones.get(&r.id).map_or(true, |&at| ticket > at))
            .collect();
        let view = completed_view(fetched);

        // Once a refresh issued after a delete's confirmation lands, the store
        // is authoritative for that id again.
        self.tombstones.retain(|_, at| ticket <= *at);

        let len = view.len();
        self.records = Arc::from(view);
        self.applied = ticket;
        self.settled = ListPhase::Loaded;
        self.finish(ticket);
        RefreshOutcome::Applied { ticket, len }
    }

    /// Record a failed refresh. The list itself is never touched. Returns
    /// `false` when the failure belongs to a superseded refresh.
    pub(crate) fn fail_refresh(&mut self, ticket: u64, message: String) -> bool {
        if self.is_stale(ticket) {
            self.finish(ticket);
            return false;
        }
        self.applied = ticket;
        self.settled = ListPhase::Errored(message);
        self.finish(ticket);
        true
    }

    /// Remove a file after the store confirmed its deletion.
    pub(crate) fn confirm_delete(&mut self, file_id: &str) -> bool {
        self.tombstones.insert(file_id.to_string(), self.issued);

        if !self.records.iter().any(|r| r.id == file_id) {
            return false;
        }
        let remaining: Vec<FileRecord> = self
            .records
            .iter()
            .filter(|r| r.id != file_id)
            .cloned()
            .collect();
        self.records = Arc::from(remaining);
        true
    }

    pub(crate) fn find_conversion(&self, conversion_id: &str) -> Option<&FileRecord> {
        self.records
            .iter()
            .find(|r| r.conversion(conversion_id).is_some())
    }
}

/// Reduce a listing to the completed-conversion view.
///
/// Keeps only complete conversions, drops records left without any, merges
/// duplicate entries for the same file id, and orders the result newest first
/// (ties broken by id).
pub fn completed_view(records: Vec<FileRecord>) -> Vec<FileRecord> {
    let mut view: Vec<FileRecord> = Vec::with_capacity(records.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for mut record in records {
        record.conversions.retain(|c| c.is_complete());
        if record.conversions.is_empty() {
            continue;
        }
        match positions.get(&record.id) {
            Some(&idx) => view[idx].merge_conversions(record.conversions),
            None => {
                positions.insert(record.id.clone(), view.len());
                view.push(record);
            }
        }
    }

    view.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    view
}
