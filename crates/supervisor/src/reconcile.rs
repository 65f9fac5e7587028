// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery.
//!
//! Converges three views of the world after a supervisor restart: the
//! durable records, the OS process table, and the (empty) in-memory
//! table. Runs once at boot before any other operation is accepted.

use crate::ports::{find_free_port, PORT_BASE};
use crate::supervisor::Supervisor;
use deck_adapters::{
    MultiplexerAdapter, ObservedBinding, TerminalServerAdapter, WorkspaceProvisioner,
};
use deck_core::{Clock, IntendedState, SessionId, SessionRecord, TerminalProcess};
use deck_storage::SessionStore;
use tracing::{debug, info, warn};

impl<M, T, W, S, C> Supervisor<M, T, W, S, C>
where
    M: MultiplexerAdapter,
    T: TerminalServerAdapter,
    W: WorkspaceProvisioner,
    S: SessionStore,
    C: Clock,
{
    /// Recover every `active` record after a restart.
    ///
    /// Per record: a missing multiplexer session demotes the record to
    /// `paused` (recreating it would silently discard the user's
    /// session content); otherwise an already-running terminal server
    /// is adopted, preferring the persisted PID for URL stability, and
    /// only when nothing is running is a fresh server spawned attached
    /// to the surviving session. One record failing never aborts the
    /// others. Ends with an orphan cleanup pass.
    pub async fn recover_sessions(&self) {
        let state = self.inner.store.get();
        let active_records: Vec<SessionRecord> = state
            .sessions
            .iter()
            .filter(|r| r.intended_state == IntendedState::Active)
            .cloned()
            .collect();
        if !active_records.is_empty() {
            info!(sessions = active_records.len(), "recovering active sessions");
        }

        let bindings = match self.inner.servers.list_bindings().await {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!(error = %e, "recovery: process scan failed, assuming none running");
                Vec::new()
            }
        };

        let mut demoted: Vec<SessionId> = Vec::new();
        let mut adopted: Vec<(SessionId, TerminalProcess)> = Vec::new();

        for record in active_records {
            let id = record.id.clone();
            let session_bindings: Vec<&ObservedBinding> = bindings
                .iter()
                .filter(|b| b.session_id.as_ref() == Some(&id))
                .collect();

            let exists = match self.inner.multiplexer.has_session(id.as_str()).await {
                Ok(exists) => exists,
                Err(e) => {
                    warn!(session_id = %id, error = %e, "recovery: multiplexer query failed, skipping");
                    continue;
                }
            };

            if !exists {
                // A terminal server without its terminal backing is
                // worse than no process; and recreating the terminal
                // here would hand the user an empty shell in place of
                // their session.
                warn!(session_id = %id, "multiplexer session missing, demoting to paused");
                for binding in &session_bindings {
                    self.inner.servers.terminate(binding.pid).await;
                }
                demoted.push(id);
                continue;
            }

            if let Some(process) = record.terminal_process.clone() {
                if self.inner.servers.is_pid_alive(process.pid).await {
                    info!(
                        session_id = %id,
                        pid = process.pid,
                        port = process.port,
                        "reconnected persisted terminal server"
                    );
                    self.adopt_server(&id, process.port, process.pid);
                    self.advance_watermark(process.port);
                    self.kill_duplicates(&id, &session_bindings, process.pid)
                        .await;
                    continue;
                }
                debug!(session_id = %id, pid = process.pid, "persisted terminal server is dead");
            }

            let newest = session_bindings
                .iter()
                .filter(|b| b.port.is_some())
                .max_by_key(|b| b.pid);
            if let Some(binding) = newest {
                if let Some(port) = binding.port {
                    info!(
                        session_id = %id,
                        pid = binding.pid,
                        port,
                        "adopted terminal server from process table"
                    );
                    self.adopt_server(&id, port, binding.pid);
                    self.advance_watermark(port);
                    self.kill_duplicates(&id, &session_bindings, binding.pid)
                        .await;
                    if record.persisted_pid() != Some(binding.pid) {
                        adopted.push((
                            id.clone(),
                            TerminalProcess {
                                port,
                                pid: binding.pid,
                                started_at: Some(self.inner.clock.now()),
                                engine: record.engine,
                            },
                        ));
                    }
                    continue;
                }
            }

            // Nothing running against a surviving session: spawn a
            // server attached to it, preferring the old port so the
            // session's URL does not move. No initial command; the
            // terminal already has content.
            let candidate = record
                .persisted_port()
                .filter(|p| *p >= PORT_BASE)
                .unwrap_or_else(|| *self.inner.next_port.lock());
            let port = match find_free_port(candidate).await {
                Ok(port) => port,
                Err(e) => {
                    warn!(session_id = %id, error = %e, "recovery: port allocation failed");
                    continue;
                }
            };
            self.advance_watermark(port);
            match self
                .spawn_server(&id, record.working_directory().cloned(), record.engine, port)
                .await
            {
                Ok(pid) => {
                    info!(session_id = %id, pid, port, "started terminal server for recovered session");
                }
                Err(e) => {
                    warn!(session_id = %id, error = %e, "recovery: failed to start terminal server");
                }
            }
        }

        if !demoted.is_empty() || !adopted.is_empty() {
            let now = self.inner.clock.now();
            let mut state = self.inner.store.get();
            for id in &demoted {
                let Some(record) = state.session_mut(id) else {
                    continue;
                };
                record.intended_state = IntendedState::Paused;
                record.paused_at = Some(now);
                record.multiplexer_cleared_at = Some(now);
                record.terminal_process = None;
                record.updated_at = Some(now);
            }
            for (id, process) in adopted {
                let Some(record) = state.session_mut(&id) else {
                    continue;
                };
                record.terminal_process = Some(process);
                record.updated_at = Some(now);
            }
            if let Err(e) = self.inner.store.update(state) {
                warn!(error = %e, "recovery: failed to persist reconciled state");
            }
        }

        self.cleanup_orphans().await;
    }

    /// Kill every binding for `id` except `keeper_pid` (best-effort).
    async fn kill_duplicates(&self, id: &SessionId, bindings: &[&ObservedBinding], keeper_pid: u32) {
        for binding in bindings {
            if binding.pid != keeper_pid {
                warn!(
                    session_id = %id,
                    pid = binding.pid,
                    keeper = keeper_pid,
                    "recovery: killing duplicate terminal server"
                );
                self.inner.servers.terminate(binding.pid).await;
            }
        }
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
