// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orphan/duplicate cleanup and process-tree teardown.

use crate::keeper::choose_keeper;
use crate::supervisor::Supervisor;
use deck_adapters::{
    MultiplexerAdapter, ObservedBinding, TerminalServerAdapter, WorkspaceProvisioner,
};
use deck_core::{Clock, SessionId, TerminalProcess};
use deck_storage::SessionStore;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Grace period between SIGTERM and SIGKILL during tree teardown.
const TREE_GRACE: Duration = Duration::from_millis(500);

/// Destroy a multiplexer session and everything running inside it.
///
/// Pane PIDs and their descendants are collected while the session is
/// still alive; kill-session may orphan them past the point where they
/// can be enumerated. Every step is best-effort.
pub async fn teardown_session_tree<M, T>(multiplexer: &M, servers: &T, id: &SessionId)
where
    M: MultiplexerAdapter,
    T: TerminalServerAdapter,
{
    let pane_pids = match multiplexer.pane_pids(id.as_str()).await {
        Ok(pids) => pids,
        Err(e) => {
            debug!(session_id = %id, error = %e, "teardown: no panes to enumerate");
            Vec::new()
        }
    };

    let mut pids: Vec<u32> = Vec::new();
    let mut queue: VecDeque<u32> = pane_pids.into_iter().collect();
    while let Some(pid) = queue.pop_front() {
        if pids.contains(&pid) {
            continue;
        }
        pids.push(pid);
        for child in servers.child_pids(pid).await {
            queue.push_back(child);
        }
    }

    if let Err(e) = multiplexer.kill_session(id.as_str()).await {
        debug!(session_id = %id, error = %e, "teardown: kill-session failed");
    }

    if pids.is_empty() {
        return;
    }
    for pid in &pids {
        servers.terminate(*pid).await;
    }
    tokio::time::sleep(TREE_GRACE).await;
    for pid in &pids {
        if servers.is_pid_alive(*pid).await {
            servers.kill(*pid).await;
        }
    }
    info!(session_id = %id, processes = pids.len(), "session process tree torn down");
}

impl<M, T, W, S, C> Supervisor<M, T, W, S, C>
where
    M: MultiplexerAdapter,
    T: TerminalServerAdapter,
    W: WorkspaceProvisioner,
    S: SessionStore,
    C: Clock,
{
    /// Kill terminal servers no protected session owns and keep exactly
    /// one per protected session id.
    ///
    /// Idempotent and safe to run arbitrarily often: on a timer, after
    /// every stop, and at the end of boot recovery. Individual kill
    /// failures are logged and never abort the batch.
    pub async fn cleanup_orphans(&self) {
        let bindings = match self.inner.servers.list_bindings().await {
            Ok(bindings) => bindings,
            Err(e) => {
                warn!(error = %e, "orphan cleanup: process scan failed");
                return;
            }
        };
        if bindings.is_empty() {
            return;
        }

        let state = self.inner.store.get();
        let protected: HashSet<SessionId> = state
            .sessions
            .iter()
            .filter(|r| r.intended_state.is_protected())
            .map(|r| r.id.clone())
            .collect();

        let mut buckets: HashMap<SessionId, Vec<&ObservedBinding>> = HashMap::new();
        let mut nameless: Vec<&ObservedBinding> = Vec::new();
        for binding in &bindings {
            match &binding.session_id {
                Some(id) => buckets.entry(id.clone()).or_default().push(binding),
                None => nameless.push(binding),
            }
        }

        let mut killed = 0usize;
        for binding in nameless {
            warn!(pid = binding.pid, "killing terminal server with no session id");
            self.inner.servers.terminate(binding.pid).await;
            killed += 1;
        }

        let mut corrections: Vec<(SessionId, u32, Option<u16>)> = Vec::new();
        for (id, bucket) in buckets {
            if !protected.contains(&id) {
                for binding in bucket {
                    warn!(
                        session_id = %id,
                        pid = binding.pid,
                        "killing terminal server for unprotected session"
                    );
                    self.inner.servers.terminate(binding.pid).await;
                    killed += 1;
                }
                continue;
            }
            if bucket.len() <= 1 {
                continue;
            }

            let candidates: Vec<u32> = bucket.iter().map(|b| b.pid).collect();
            let in_memory = self.active_entry(&id).map(|e| e.pid);
            let persisted = state.session(&id).and_then(|r| r.persisted_pid());
            let Some(keeper) = choose_keeper(&candidates, in_memory, persisted) else {
                continue;
            };

            for binding in &bucket {
                if binding.pid != keeper {
                    warn!(
                        session_id = %id,
                        pid = binding.pid,
                        keeper,
                        "killing duplicate terminal server"
                    );
                    self.inner.servers.terminate(binding.pid).await;
                    killed += 1;
                }
            }

            if persisted != Some(keeper) {
                let port = bucket.iter().find(|b| b.pid == keeper).and_then(|b| b.port);
                corrections.push((id, keeper, port));
            }
        }

        if !corrections.is_empty() {
            let now = self.inner.clock.now();
            let mut state = self.inner.store.get();
            let mut dirty = false;
            for (id, pid, port) in corrections {
                let Some(record) = state.session_mut(&id) else {
                    continue;
                };
                let Some(port) = port.or_else(|| record.persisted_port()) else {
                    debug!(session_id = %id, pid, "keeper has no known port, not persisting");
                    continue;
                };
                let engine = record.engine;
                record.terminal_process = Some(TerminalProcess {
                    port,
                    pid,
                    started_at: Some(now),
                    engine,
                });
                record.updated_at = Some(now);
                dirty = true;
            }
            if dirty {
                if let Err(e) = self.inner.store.update(state) {
                    warn!(error = %e, "orphan cleanup: failed to persist keeper corrections");
                }
            }
        }

        if killed > 0 {
            info!(killed, "orphan cleanup complete");
        }
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
