// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session heartbeat tracking.
//!
//! Reports arrive from an external hook mechanism, possibly duplicated
//! and out of order; the max-merge in [`Liveness::observe`] absorbs
//! both. The tracker is deliberately independent of the active-session
//! table so a "done" signal survives its terminal server going away.

use deck_core::{ActivityStatus, Liveness, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;

/// A `working` report older than this is treated as an agent that died
/// without saying "done".
pub const HEARTBEAT_TIMEOUT_MS: u64 = 60 * 60 * 1000;

/// Effective per-session status after staleness is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub is_working: bool,
    pub is_done: bool,
}

/// In-memory liveness table, owned by one supervisor instance.
#[derive(Default)]
pub struct LivenessTracker {
    entries: Mutex<HashMap<SessionId, Liveness>>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry from a persisted record (boot restore).
    pub fn restore(&self, id: SessionId, liveness: Liveness) {
        if liveness.is_empty() {
            return;
        }
        self.entries.lock().insert(id, liveness);
    }

    /// Merge a report and return the merged entry for persistence.
    pub fn report(&self, id: &SessionId, status: ActivityStatus, at_ms: u64) -> Liveness {
        let mut entries = self.entries.lock();
        let entry = entries.entry(id.clone()).or_default();
        entry.observe(status, at_ms);
        *entry
    }

    pub fn get(&self, id: &SessionId) -> Option<Liveness> {
        self.entries.lock().get(id).copied()
    }

    /// Effective status for every session with any liveness data.
    ///
    /// A session whose last `working` report is older than the
    /// heartbeat timeout is stale: not working, and done regardless of
    /// whether an explicit `done` ever arrived.
    pub fn status_map(&self, now_ms: u64) -> HashMap<SessionId, SessionStatus> {
        let entries = self.entries.lock();
        let mut out = HashMap::with_capacity(entries.len());
        for (id, liveness) in entries.iter() {
            if liveness.is_empty() {
                continue;
            }
            let is_stale = now_ms.saturating_sub(liveness.last_working_at) > HEARTBEAT_TIMEOUT_MS;
            let is_working = !is_stale && liveness.last_working_at > liveness.last_done_at;
            let is_done = !is_working && (liveness.last_done_at > 0 || is_stale);
            out.insert(
                id.clone(),
                SessionStatus {
                    is_working,
                    is_done,
                },
            );
        }
        out
    }

    /// Drop a session's entry if its effective status is `done`.
    ///
    /// Called when a user reopens a session so the done badge does not
    /// reappear from stale data. A `working` session is left alone.
    /// Returns whether anything was removed.
    pub fn clear_done(&self, id: &SessionId) -> bool {
        let mut entries = self.entries.lock();
        let done = entries
            .get(id)
            .is_some_and(|l| l.last_done_at >= l.last_working_at && l.last_done_at > 0);
        if done {
            entries.remove(id);
        }
        done
    }

    /// Drop a session's entry unconditionally (record deletion).
    pub fn forget(&self, id: &SessionId) {
        self.entries.lock().remove(id);
    }
}

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;
