// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Web-terminal server (ttyd) adapter.
//!
//! A terminal server is the disposable half of a session: it serves one
//! multiplexer session over one HTTP port and can be killed and
//! respawned at any time without losing session content. This module
//! also owns the process-table queries the supervisor needs to find
//! servers it did not spawn.

mod ttyd;

pub use ttyd::TtydServerAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeServerAdapter, ServerCall};

use async_trait::async_trait;
use deck_core::SessionId;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors from terminal-server operations
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("process query failed: {0}")]
    QueryFailed(String),
}

/// What to spawn a terminal server as.
#[derive(Debug, Clone)]
pub struct ServerSpawnSpec {
    pub session_id: SessionId,
    pub port: u16,
    pub working_directory: Option<PathBuf>,
}

/// A freshly spawned terminal server.
///
/// `exited` fires once when the process exits, carrying the exit code
/// if one was observed. The caller owns reacting to the exit; the
/// adapter only reports it.
#[derive(Debug)]
pub struct SpawnedServer {
    pub pid: u32,
    pub exited: oneshot::Receiver<Option<i32>>,
}

/// A terminal-server process observed in the OS process table.
///
/// `port` and `session_id` are parsed from the command line and may be
/// absent for malformed or foreign invocations; a binding without a
/// session id cannot belong to any session and is an orphan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedBinding {
    pub pid: u32,
    pub port: Option<u16>,
    pub session_id: Option<SessionId>,
}

/// Adapter for terminal-server processes and process-table queries.
#[async_trait]
pub trait TerminalServerAdapter: Clone + Send + Sync + 'static {
    /// Spawn a terminal server for a session.
    async fn spawn(&self, spec: &ServerSpawnSpec) -> Result<SpawnedServer, ServerError>;

    /// Scan the process table for terminal-server processes.
    async fn list_bindings(&self) -> Result<Vec<ObservedBinding>, ServerError>;

    /// Whether a process with this PID currently exists.
    async fn is_pid_alive(&self, pid: u32) -> bool;

    /// Best-effort SIGTERM.
    async fn terminate(&self, pid: u32);

    /// Best-effort SIGKILL.
    async fn kill(&self, pid: u32);

    /// Direct children of a PID.
    async fn child_pids(&self, pid: u32) -> Vec<u32>;
}
