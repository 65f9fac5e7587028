// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable session record and liveness types.
//!
//! The record serializes in the camelCase shape of the on-disk state
//! document. Every field except `id` is defaulted so older documents
//! missing fields still load; the store's migration pass fills in the
//! rest.

use crate::{Engine, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The user's desired state for a session, independent of what is
/// actually running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IntendedState {
    Active,
    #[default]
    Paused,
    Archived,
}

impl IntendedState {
    /// Protected sessions keep their terminal-server processes during
    /// orphan cleanup. Paused sessions are protected because their tmux
    /// session (and anything running inside it) must survive.
    pub fn is_protected(&self) -> bool {
        matches!(self, IntendedState::Active | IntendedState::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntendedState::Active => "active",
            IntendedState::Paused => "paused",
            IntendedState::Archived => "archived",
        }
    }
}

impl serde::Serialize for IntendedState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for IntendedState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "active" => Ok(IntendedState::Active),
            "archived" => Ok(IntendedState::Archived),
            // "paused" + legacy values ("stopped") map to Paused, which is
            // the protected class — safer than letting cleanup kill them.
            _ => Ok(IntendedState::Paused),
        }
    }
}

/// Last known terminal-server binding, persisted so a supervisor
/// restart can reconnect to the process it spawned before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalProcess {
    pub port: u16,
    pub pid: u32,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub engine: Engine,
}

/// An activity report from the agent hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Working,
    Done,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Working => "working",
            ActivityStatus::Done => "done",
        }
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid activity status: {0}")]
pub struct ParseActivityStatusError(String);

impl std::str::FromStr for ActivityStatus {
    type Err = ParseActivityStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" => Ok(ActivityStatus::Working),
            "done" => Ok(ActivityStatus::Done),
            other => Err(ParseActivityStatusError(other.to_string())),
        }
    }
}

/// Merged heartbeat timestamps for one session.
///
/// Both fields are epoch milliseconds and only ever advance: a report
/// moves the matching field forward with `max()`, so duplicate and
/// out-of-order reports are absorbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Liveness {
    #[serde(default)]
    pub last_working_at: u64,
    #[serde(default)]
    pub last_done_at: u64,
}

impl Liveness {
    /// Record a report, advancing the matching timestamp (never regresses).
    pub fn observe(&mut self, status: ActivityStatus, at_ms: u64) {
        match status {
            ActivityStatus::Working => {
                self.last_working_at = self.last_working_at.max(at_ms);
            }
            ActivityStatus::Done => {
                self.last_done_at = self.last_done_at.max(at_ms);
            }
        }
    }

    /// Effective status from the raw timestamps (no staleness applied).
    pub fn effective(&self) -> ActivityStatus {
        if self.last_working_at > self.last_done_at {
            ActivityStatus::Working
        } else {
            ActivityStatus::Done
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_working_at == 0 && self.last_done_at == 0
    }
}

/// Reference to a provisioned workspace (e.g. a git worktree) owned by
/// a session. Removal is delegated to the workspace provisioner when
/// the session is garbage-collected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceRef {
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub repo: Option<String>,
}

/// Durable session record, owned by the store and mutated only through
/// the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: SessionId,
    #[serde(default)]
    pub engine: Engine,
    /// Working directory for the session's terminal.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub initial_command: Option<String>,
    #[serde(default)]
    pub intended_state: IntendedState,
    #[serde(default, alias = "ttydProcess")]
    pub terminal_process: Option<TerminalProcess>,
    #[serde(default, alias = "hookStatus")]
    pub liveness: Option<Liveness>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "tmuxCleanedAt")]
    pub multiplexer_cleared_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "worktree")]
    pub workspace: Option<WorkspaceRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// A new active record with everything else unset.
    pub fn new(id: SessionId, engine: Engine, path: Option<PathBuf>) -> Self {
        Self {
            id,
            engine,
            path,
            initial_command: None,
            intended_state: IntendedState::Active,
            terminal_process: None,
            liveness: None,
            paused_at: None,
            archived_at: None,
            multiplexer_cleared_at: None,
            workspace: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Working directory to launch the session in, preferring the
    /// session's own path over its workspace's.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.path
            .as_ref()
            .or_else(|| self.workspace.as_ref().and_then(|w| w.path.as_ref()))
    }

    /// PID persisted in `terminal_process`, if any.
    pub fn persisted_pid(&self) -> Option<u32> {
        self.terminal_process.as_ref().map(|tp| tp.pid)
    }

    /// Port persisted in `terminal_process`, if any.
    pub fn persisted_port(&self) -> Option<u16> {
        self.terminal_process.as_ref().map(|tp| tp.port)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
