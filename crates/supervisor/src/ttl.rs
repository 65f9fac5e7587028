// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL garbage collection for paused and archived sessions.

use crate::supervisor::Supervisor;
use deck_adapters::{MultiplexerAdapter, TerminalServerAdapter, WorkspaceProvisioner};
use deck_core::{Clock, IntendedState, SessionRecord};
use deck_storage::SessionStore;
use tracing::{debug, info, warn};

/// Paused sessions keep their multiplexer session this long.
const PAUSED_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Archived records are deleted outright after this long.
const ARCHIVED_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;

impl<M, T, W, S, C> Supervisor<M, T, W, S, C>
where
    M: MultiplexerAdapter,
    T: TerminalServerAdapter,
    W: WorkspaceProvisioner,
    S: SessionStore,
    C: Clock,
{
    /// Run both TTL sweeps.
    pub async fn sweep_ttls(&self) {
        self.sweep_paused_ttl().await;
        self.sweep_archived_ttl().await;
    }

    /// Destroy the multiplexer session of any record paused longer
    /// than the TTL, stamping `multiplexer_cleared_at` so the sweep
    /// never revisits it. The record itself is kept.
    pub async fn sweep_paused_ttl(&self) {
        let now = self.inner.clock.now();
        let state = self.inner.store.get();
        let expired: Vec<_> = state
            .sessions
            .iter()
            .filter(|r| {
                r.intended_state == IntendedState::Paused
                    && r.multiplexer_cleared_at.is_none()
                    && r.paused_at
                        .is_some_and(|t| (now - t).num_milliseconds() > PAUSED_TTL_MS)
            })
            .map(|r| r.id.clone())
            .collect();
        if expired.is_empty() {
            return;
        }

        for id in &expired {
            info!(session_id = %id, "paused TTL expired, destroying multiplexer session");
            if let Err(e) = self.inner.multiplexer.kill_session(id.as_str()).await {
                debug!(session_id = %id, error = %e, "paused TTL: kill-session failed");
            }
        }

        let mut state = self.inner.store.get();
        for id in &expired {
            if let Some(record) = state.session_mut(id) {
                record.multiplexer_cleared_at = Some(now);
                record.updated_at = Some(now);
            }
        }
        if let Err(e) = self.inner.store.update(state) {
            warn!(error = %e, "paused TTL: failed to persist");
        }
    }

    /// Delete any record archived longer than the TTL, requesting
    /// workspace removal as a fire-and-forget side effect. The core's
    /// invariants hold even if every removal fails.
    pub async fn sweep_archived_ttl(&self) {
        let now = self.inner.clock.now();
        let state = self.inner.store.get();
        let expired: Vec<SessionRecord> = state
            .sessions
            .iter()
            .filter(|r| {
                r.intended_state == IntendedState::Archived
                    && r.archived_at
                        .is_some_and(|t| (now - t).num_milliseconds() > ARCHIVED_TTL_MS)
            })
            .cloned()
            .collect();
        if expired.is_empty() {
            return;
        }

        for record in &expired {
            info!(session_id = %record.id, "archived TTL expired, deleting session record");
            if let Some(workspace) = record.workspace.clone() {
                let provisioner = self.inner.provisioner.clone();
                let session_id = record.id.to_string();
                tokio::spawn(async move {
                    if let Err(e) = provisioner.remove(&session_id, &workspace).await {
                        debug!(session_id = %session_id, error = %e, "workspace removal failed");
                    }
                });
            }
            self.inner.liveness.forget(&record.id);
        }

        let mut state = self.inner.store.get();
        for record in &expired {
            state.remove(&record.id);
        }
        if let Err(e) = self.inner.store.update(state) {
            warn!(error = %e, "archived TTL: failed to persist");
        }
    }
}

#[cfg(test)]
#[path = "ttl_tests.rs"]
mod tests;
