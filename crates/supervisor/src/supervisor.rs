// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session process supervisor.
//!
//! One instance owns the in-memory active-session table, the liveness
//! tracker, and the next-port watermark; nothing here is process-wide,
//! so tests can run many supervisors side by side. Store writes are
//! read-modify-write cycles against the whole document.

use crate::cleanup;
use crate::liveness::{LivenessTracker, SessionStatus};
use crate::ports::{find_free_port, PORT_BASE};
use deck_adapters::{
    MultiplexerAdapter, MultiplexerError, PaneDirection, ScrollDirection, ServerError,
    ServerSpawnSpec, TerminalServerAdapter, WorkspaceProvisioner, ALLOWED_KEYS,
};
use deck_core::{
    ActivityStatus, Clock, Engine, IntendedState, Liveness, SessionId, SessionRecord,
    TerminalProcess,
};
use deck_storage::SessionStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How long after spawn before checking the server is still there.
pub(crate) const SPAWN_VERIFY_DELAY: Duration = Duration::from_millis(500);

/// Grace period between SIGTERM and SIGKILL on stop.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Errors surfaced to supervisor callers.
///
/// Transient OS races (dead PIDs, vanished multiplexer sessions during
/// cleanup) never show up here; those are logged and absorbed.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("port allocation failed: {0}")]
    PortAllocation(#[from] std::io::Error),
    #[error(transparent)]
    Multiplexer(#[from] MultiplexerError),
    #[error(transparent)]
    Server(#[from] ServerError),
    #[error("terminal server for {0} exited during startup")]
    SpawnVerification(SessionId),
    #[error("key not allowed: {0}")]
    KeyNotAllowed(String),
}

/// One entry in the in-memory active-session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ActiveEntry {
    pub port: u16,
    pub pid: u32,
    /// False when the entry was adopted from the process table after a
    /// supervisor restart rather than spawned by this instance.
    pub spawned: bool,
}

/// Parameters for [`Supervisor::start`].
#[derive(Debug, Clone)]
pub struct StartRequest {
    pub session_id: SessionId,
    pub working_directory: Option<PathBuf>,
    pub initial_command: Option<String>,
    pub engine: Engine,
    pub preferred_port: Option<u16>,
}

/// What a successful `start` hands back to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub port: u16,
    pub proxy_path: String,
}

/// Runtime view of one session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStatus {
    pub server_running: bool,
    pub needs_restart: bool,
}

pub(crate) struct Inner<M, T, W, S, C> {
    pub(crate) multiplexer: M,
    pub(crate) servers: T,
    pub(crate) provisioner: W,
    pub(crate) store: S,
    pub(crate) clock: C,
    pub(crate) active: Mutex<HashMap<SessionId, ActiveEntry>>,
    pub(crate) liveness: LivenessTracker,
    pub(crate) next_port: Mutex<u16>,
}

/// The session process supervisor. Cheap to clone; clones share state.
pub struct Supervisor<M, T, W, S, C> {
    pub(crate) inner: Arc<Inner<M, T, W, S, C>>,
}

impl<M, T, W, S, C> Clone for Supervisor<M, T, W, S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M, T, W, S, C> Supervisor<M, T, W, S, C>
where
    M: MultiplexerAdapter,
    T: TerminalServerAdapter,
    W: WorkspaceProvisioner,
    S: SessionStore,
    C: Clock,
{
    pub fn new(multiplexer: M, servers: T, provisioner: W, store: S, clock: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                multiplexer,
                servers,
                provisioner,
                store,
                clock,
                active: Mutex::new(HashMap::new()),
                liveness: LivenessTracker::new(),
                next_port: Mutex::new(PORT_BASE),
            }),
        }
    }

    /// Start a terminal server for a session.
    ///
    /// Idempotent: a second call while the first server is alive
    /// returns the existing binding. A stale table entry (PID no
    /// longer alive) is discarded and the start proceeds fresh.
    pub async fn start(&self, req: StartRequest) -> Result<StartOutcome, SupervisorError> {
        let id = req.session_id.clone();

        if let Some(entry) = self.active_entry(&id) {
            if self.inner.servers.is_pid_alive(entry.pid).await {
                debug!(session_id = %id, port = entry.port, "start: already running");
                return Ok(StartOutcome {
                    port: entry.port,
                    proxy_path: id.proxy_path(),
                });
            }
            warn!(
                session_id = %id,
                pid = entry.pid,
                "start: stale entry for dead process, relaunching"
            );
            self.remove_active_if_pid(&id, entry.pid);
        }

        let candidate = match req.preferred_port {
            Some(p) if p >= PORT_BASE => p,
            _ => *self.inner.next_port.lock(),
        };
        let port = find_free_port(candidate).await?;
        self.advance_watermark(port);

        // The server attaches to the multiplexer session by name, so
        // create it first; the initial command goes in only on a brand
        // new session, never into surviving content.
        let existed = self.inner.multiplexer.has_session(id.as_str()).await?;
        self.inner
            .multiplexer
            .create_session(id.as_str(), req.working_directory.as_deref())
            .await?;
        if !existed {
            if let Some(command) = req.initial_command.as_deref().filter(|c| !c.is_empty()) {
                self.inner.multiplexer.send_text(id.as_str(), command).await?;
                self.inner.multiplexer.send_key(id.as_str(), "Enter").await?;
            }
        }

        let pid = self
            .spawn_server(&id, req.working_directory, req.engine, port)
            .await?;
        info!(session_id = %id, port, pid, "terminal server started");
        Ok(StartOutcome {
            port,
            proxy_path: id.proxy_path(),
        })
    }

    /// Stop a session's terminal server.
    ///
    /// Returns false when nothing was running. With
    /// `preserve_multiplexer` the tmux session (and whatever runs in
    /// it) survives for a later reconnect; otherwise the whole process
    /// tree is torn down. Liveness is retained either way so a "done"
    /// badge outlives the server.
    pub async fn stop(&self, id: &SessionId, preserve_multiplexer: bool) -> bool {
        let Some(entry) = self.active_entry(id) else {
            return false;
        };
        info!(
            session_id = %id,
            pid = entry.pid,
            port = entry.port,
            preserve_multiplexer,
            "stopping terminal server"
        );

        self.inner.servers.terminate(entry.pid).await;
        tokio::time::sleep(STOP_GRACE).await;
        if self.inner.servers.is_pid_alive(entry.pid).await {
            self.inner.servers.kill(entry.pid).await;
        }

        if !preserve_multiplexer {
            cleanup::teardown_session_tree(&self.inner.multiplexer, &self.inner.servers, id).await;
        }

        self.clear_terminal_process_if_pid(id, entry.pid);
        self.remove_active_if_pid(id, entry.pid);
        true
    }

    /// Deliver a named control key. Anything outside the allow-list is
    /// rejected; arbitrary sequences must go through [`send_text`].
    ///
    /// [`send_text`]: Supervisor::send_text
    pub async fn send_key(&self, id: &SessionId, key: &str) -> Result<(), SupervisorError> {
        if !ALLOWED_KEYS.contains(&key) {
            return Err(SupervisorError::KeyNotAllowed(key.to_string()));
        }
        self.inner.multiplexer.send_key(id.as_str(), key).await?;
        Ok(())
    }

    /// Deliver literal text (no key-name interpretation).
    pub async fn send_text(&self, id: &SessionId, text: &str) -> Result<(), SupervisorError> {
        self.inner.multiplexer.send_text(id.as_str(), text).await?;
        Ok(())
    }

    /// Last `lines` lines of the session's scrollback.
    pub async fn capture_content(
        &self,
        id: &SessionId,
        lines: u32,
    ) -> Result<String, SupervisorError> {
        Ok(self.inner.multiplexer.capture(id.as_str(), lines).await?)
    }

    pub async fn scroll(
        &self,
        id: &SessionId,
        direction: ScrollDirection,
        steps: u32,
    ) -> Result<(), SupervisorError> {
        self.inner
            .multiplexer
            .scroll(id.as_str(), direction, steps)
            .await?;
        Ok(())
    }

    pub async fn select_pane(
        &self,
        id: &SessionId,
        direction: PaneDirection,
    ) -> Result<(), SupervisorError> {
        self.inner
            .multiplexer
            .select_pane(id.as_str(), direction)
            .await?;
        Ok(())
    }

    pub async fn exit_copy_mode(&self, id: &SessionId) -> Result<(), SupervisorError> {
        self.inner.multiplexer.exit_copy_mode(id.as_str()).await?;
        Ok(())
    }

    /// Whether this supervisor is tracking a server for the session.
    pub fn is_active(&self, id: &SessionId) -> bool {
        self.inner.active.lock().contains_key(id)
    }

    /// `(port, pid)` of the tracked server, if any.
    pub fn active_binding(&self, id: &SessionId) -> Option<(u16, u32)> {
        self.active_entry(id).map(|e| (e.port, e.pid))
    }

    /// Runtime view of a record: is its server actually running, and
    /// does its intended state demand a restart.
    pub async fn runtime_status(&self, record: &SessionRecord) -> RuntimeStatus {
        let pid = self
            .active_entry(&record.id)
            .map(|e| e.pid)
            .or_else(|| record.persisted_pid());
        let server_running = match pid {
            Some(pid) => self.inner.servers.is_pid_alive(pid).await,
            None => false,
        };
        RuntimeStatus {
            server_running,
            needs_restart: record.intended_state == IntendedState::Active && !server_running,
        }
    }

    /// Record a heartbeat report and persist the merged entry.
    ///
    /// A zero or missing timestamp is coerced to "now".
    pub fn report_activity(
        &self,
        id: &SessionId,
        status: ActivityStatus,
        reported_at_ms: u64,
    ) -> Liveness {
        let at_ms = if reported_at_ms > 0 {
            reported_at_ms
        } else {
            self.inner.clock.now_ms()
        };
        debug!(session_id = %id, %status, at_ms, "activity report");
        let merged = self.inner.liveness.report(id, status, at_ms);

        let mut state = self.inner.store.get();
        if let Some(record) = state.session_mut(id) {
            record.liveness = Some(merged);
            record.updated_at = Some(self.inner.clock.now());
            if let Err(e) = self.inner.store.update(state) {
                warn!(session_id = %id, error = %e, "failed to persist liveness");
            }
        }
        merged
    }

    /// Effective status for every session with liveness data.
    pub fn session_status(&self) -> HashMap<SessionId, SessionStatus> {
        self.inner.liveness.status_map(self.inner.clock.now_ms())
    }

    /// Forget a session's liveness if it currently reads as done, in
    /// memory and in the store. No-op for working sessions.
    pub fn clear_done_status(&self, id: &SessionId) {
        if !self.inner.liveness.clear_done(id) {
            return;
        }
        let mut state = self.inner.store.get();
        if let Some(record) = state.session_mut(id) {
            record.liveness = None;
            record.updated_at = Some(self.inner.clock.now());
            if let Err(e) = self.inner.store.update(state) {
                warn!(session_id = %id, error = %e, "failed to persist liveness clear");
            }
        }
    }

    /// Load persisted liveness into the tracker (boot, before recovery).
    pub fn restore_liveness(&self) {
        let state = self.inner.store.get();
        let mut restored = 0usize;
        for record in &state.sessions {
            if let Some(liveness) = record.liveness {
                if !liveness.is_empty() {
                    self.inner.liveness.restore(record.id.clone(), liveness);
                    restored += 1;
                }
            }
        }
        if restored > 0 {
            info!(restored, "restored persisted liveness entries");
        }
    }

    /// Stop every tracked server while preserving their multiplexer
    /// sessions, so the next boot can reconnect instead of losing
    /// session content.
    pub async fn shutdown(&self) {
        let ids: Vec<SessionId> = self.inner.active.lock().keys().cloned().collect();
        info!(sessions = ids.len(), "supervisor shutdown");
        for id in ids {
            self.stop(&id, true).await;
        }
    }

    // --- internals shared with reconcile/cleanup ---

    pub(crate) fn active_entry(&self, id: &SessionId) -> Option<ActiveEntry> {
        self.inner.active.lock().get(id).copied()
    }

    /// Remove the table entry only if it still records `pid`.
    pub(crate) fn remove_active_if_pid(&self, id: &SessionId, pid: u32) -> bool {
        let mut active = self.inner.active.lock();
        match active.get(id) {
            Some(entry) if entry.pid == pid => {
                active.remove(id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn advance_watermark(&self, port: u16) {
        let mut next = self.inner.next_port.lock();
        *next = (*next).max(port.saturating_add(1));
    }

    /// Spawn a terminal server, register it, persist the binding, and
    /// verify it survives its first moments.
    pub(crate) async fn spawn_server(
        &self,
        id: &SessionId,
        working_directory: Option<PathBuf>,
        engine: Engine,
        port: u16,
    ) -> Result<u32, SupervisorError> {
        let spec = ServerSpawnSpec {
            session_id: id.clone(),
            port,
            working_directory,
        };
        let spawned = self.inner.servers.spawn(&spec).await?;
        let pid = spawned.pid;

        self.inner.active.lock().insert(
            id.clone(),
            ActiveEntry {
                port,
                pid,
                spawned: true,
            },
        );
        // Persisted before verification so a supervisor crash right
        // here is still recoverable by the next boot's reconciliation.
        self.persist_terminal_process(
            id,
            TerminalProcess {
                port,
                pid,
                started_at: Some(self.inner.clock.now()),
                engine,
            },
        );

        let supervisor = self.clone();
        let exit_id = id.clone();
        let exited = spawned.exited;
        tokio::spawn(async move {
            let code = exited.await.unwrap_or(None);
            supervisor.handle_server_exit(&exit_id, pid, code);
        });

        tokio::time::sleep(SPAWN_VERIFY_DELAY).await;
        if !self.inner.servers.is_pid_alive(pid).await {
            warn!(session_id = %id, pid, "terminal server died during startup");
            self.remove_active_if_pid(id, pid);
            self.clear_terminal_process_if_pid(id, pid);
            return Err(SupervisorError::SpawnVerification(id.clone()));
        }
        Ok(pid)
    }

    /// Adopt an already-running server into the table (boot recovery).
    pub(crate) fn adopt_server(&self, id: &SessionId, port: u16, pid: u32) {
        self.inner.active.lock().insert(
            id.clone(),
            ActiveEntry {
                port,
                pid,
                spawned: false,
            },
        );
    }

    fn handle_server_exit(&self, id: &SessionId, pid: u32, code: Option<i32>) {
        info!(session_id = %id, pid, code = ?code, "terminal server exited");
        // A newer spawn may have replaced this PID while the handler
        // was in flight; in that case this exit is history.
        if !self.remove_active_if_pid(id, pid) {
            debug!(session_id = %id, pid, "exit from superseded process, ignoring");
            return;
        }
        self.clear_terminal_process_if_pid(id, pid);
        // The multiplexer session stays: only explicit stop/archive/TTL
        // actions destroy it.
    }

    pub(crate) fn persist_terminal_process(&self, id: &SessionId, process: TerminalProcess) {
        let mut state = self.inner.store.get();
        let Some(record) = state.session_mut(id) else {
            debug!(session_id = %id, "no record to persist terminal process into");
            return;
        };
        record.terminal_process = Some(process);
        record.updated_at = Some(self.inner.clock.now());
        if let Err(e) = self.inner.store.update(state) {
            warn!(session_id = %id, error = %e, "failed to persist terminal process");
        }
    }

    /// Clear the persisted binding only while it still names `pid`, so
    /// a stale exit handler can never erase a newer spawn's record.
    pub(crate) fn clear_terminal_process_if_pid(&self, id: &SessionId, pid: u32) {
        let mut state = self.inner.store.get();
        let Some(record) = state.session_mut(id) else {
            return;
        };
        match &record.terminal_process {
            Some(process) if process.pid == pid => {
                record.terminal_process = None;
                record.updated_at = Some(self.inner.clock.now());
                if let Err(e) = self.inner.store.update(state) {
                    warn!(session_id = %id, error = %e, "failed to clear terminal process");
                }
            }
            Some(process) => {
                debug!(
                    session_id = %id,
                    persisted = process.pid,
                    exited = pid,
                    "guarded clear: persisted binding belongs to a newer process"
                );
            }
            None => {}
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
