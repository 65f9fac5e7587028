// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake terminal-server adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ObservedBinding, ServerError, ServerSpawnSpec, SpawnedServer, TerminalServerAdapter};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Recorded terminal-server call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCall {
    Spawn { session_id: String, port: u16 },
    ListBindings,
    IsPidAlive { pid: u32 },
    Terminate { pid: u32 },
    Kill { pid: u32 },
    ChildPids { pid: u32 },
}

#[derive(Default)]
struct FakeServerState {
    next_pid: u32,
    alive: HashSet<u32>,
    bindings: Vec<ObservedBinding>,
    children: HashMap<u32, Vec<u32>>,
    exit_senders: HashMap<u32, oneshot::Sender<Option<i32>>>,
    /// PIDs that ignore SIGTERM and only die to SIGKILL.
    term_immune: HashSet<u32>,
    fail_next_spawn: Option<String>,
    calls: Vec<ServerCall>,
}

/// Fake terminal-server adapter for testing
#[derive(Clone)]
pub struct FakeServerAdapter {
    inner: Arc<Mutex<FakeServerState>>,
}

impl Default for FakeServerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServerAdapter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeServerState {
                next_pid: 1000,
                ..FakeServerState::default()
            })),
        }
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ServerCall> {
        self.inner.lock().calls.clone()
    }

    /// Make the next spawn fail with this message.
    pub fn fail_next_spawn(&self, message: &str) {
        self.inner.lock().fail_next_spawn = Some(message.to_string());
    }

    /// Register a process that exists without having been spawned here.
    pub fn add_external_pid(&self, pid: u32) {
        self.inner.lock().alive.insert(pid);
    }

    /// Seed the process-table scan result.
    pub fn set_bindings(&self, bindings: Vec<ObservedBinding>) {
        let mut inner = self.inner.lock();
        for binding in &bindings {
            inner.alive.insert(binding.pid);
        }
        inner.bindings = bindings;
    }

    /// Seed direct children of a PID.
    pub fn set_child_pids(&self, pid: u32, children: Vec<u32>) {
        let mut inner = self.inner.lock();
        for child in &children {
            inner.alive.insert(*child);
        }
        inner.children.insert(pid, children);
    }

    /// Make a PID survive SIGTERM so only SIGKILL removes it.
    pub fn make_term_immune(&self, pid: u32) {
        self.inner.lock().term_immune.insert(pid);
    }

    /// Simulate the process exiting on its own, firing the exit
    /// notification handed out at spawn time.
    pub fn trigger_exit(&self, pid: u32, code: Option<i32>) {
        let sender = {
            let mut inner = self.inner.lock();
            inner.alive.remove(&pid);
            inner.bindings.retain(|b| b.pid != pid);
            inner.exit_senders.remove(&pid)
        };
        if let Some(sender) = sender {
            let _ = sender.send(code);
        }
    }

    pub fn pid_alive(&self, pid: u32) -> bool {
        self.inner.lock().alive.contains(&pid)
    }

    fn remove_pid(&self, pid: u32) {
        let mut inner = self.inner.lock();
        inner.alive.remove(&pid);
        inner.bindings.retain(|b| b.pid != pid);
    }
}

#[async_trait]
impl TerminalServerAdapter for FakeServerAdapter {
    async fn spawn(&self, spec: &ServerSpawnSpec) -> Result<SpawnedServer, ServerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ServerCall::Spawn {
            session_id: spec.session_id.0.clone(),
            port: spec.port,
        });
        if let Some(message) = inner.fail_next_spawn.take() {
            return Err(ServerError::SpawnFailed(message));
        }

        let pid = inner.next_pid;
        inner.next_pid += 1;
        inner.alive.insert(pid);
        inner.bindings.push(ObservedBinding {
            pid,
            port: Some(spec.port),
            session_id: Some(spec.session_id.clone()),
        });

        let (tx, rx) = oneshot::channel();
        inner.exit_senders.insert(pid, tx);
        Ok(SpawnedServer { pid, exited: rx })
    }

    async fn list_bindings(&self) -> Result<Vec<ObservedBinding>, ServerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(ServerCall::ListBindings);
        Ok(inner.bindings.clone())
    }

    async fn is_pid_alive(&self, pid: u32) -> bool {
        let mut inner = self.inner.lock();
        inner.calls.push(ServerCall::IsPidAlive { pid });
        inner.alive.contains(&pid)
    }

    async fn terminate(&self, pid: u32) {
        let immune = {
            let mut inner = self.inner.lock();
            inner.calls.push(ServerCall::Terminate { pid });
            inner.term_immune.contains(&pid)
        };
        if !immune {
            self.remove_pid(pid);
        }
    }

    async fn kill(&self, pid: u32) {
        self.inner.lock().calls.push(ServerCall::Kill { pid });
        self.remove_pid(pid);
    }

    async fn child_pids(&self, pid: u32) -> Vec<u32> {
        let mut inner = self.inner.lock();
        inner.calls.push(ServerCall::ChildPids { pid });
        inner.children.get(&pid).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
