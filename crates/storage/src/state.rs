// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The on-disk state document.

use deck_core::{SessionId, SessionRecord};
use serde::{Deserialize, Serialize};

/// Whole-document session state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub schema_version: u32,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}

impl SessionState {
    pub fn session(&self, id: &SessionId) -> Option<&SessionRecord> {
        self.sessions.iter().find(|s| &s.id == id)
    }

    pub fn session_mut(&mut self, id: &SessionId) -> Option<&mut SessionRecord> {
        self.sessions.iter_mut().find(|s| &s.id == id)
    }

    /// Replace the record with the same id, or append if absent.
    pub fn upsert(&mut self, record: SessionRecord) {
        match self.session_mut(&record.id) {
            Some(existing) => *existing = record,
            None => self.sessions.push(record),
        }
    }

    /// Remove a record by id, returning whether anything was removed.
    pub fn remove(&mut self, id: &SessionId) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| &s.id != id);
        self.sessions.len() < before
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
