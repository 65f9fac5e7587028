// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::path::PathBuf;

use fs2::FileExt;
use thiserror::Error;
use tracing::info;

use deck_adapters::{NoopProvisioner, TmuxMultiplexer, TtydServerAdapter};
use deck_core::SystemClock;
use deck_storage::{FileStore, StoreError};
use deck_supervisor::Supervisor;

use crate::env;

/// Daemon supervisor with concrete adapter types
pub type DaemonSupervisor =
    Supervisor<TmuxMultiplexer, TtydServerAdapter, NoopProvisioner, FileStore, SystemClock>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/deck)
    pub state_dir: PathBuf,
    /// Path to the session state document
    pub state_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `~/.local/state/deck/` (or
    /// `$XDG_STATE_HOME/deck/`). One daemon serves all sessions for a user.
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::in_dir(env::state_dir()?))
    }

    /// Configuration rooted at an explicit state directory.
    pub fn in_dir(state_dir: PathBuf) -> Self {
        Self {
            state_path: state_dir.join("state.json"),
            lock_path: state_dir.join("deckd.pid"),
            log_path: state_dir.join("deckd.log"),
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct Daemon {
    /// Configuration
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// The session supervisor
    pub supervisor: DaemonSupervisor,
}

impl Daemon {
    /// Shutdown the daemon gracefully.
    ///
    /// Terminal servers are stopped but multiplexer sessions are
    /// intentionally preserved so agents keep running across daemon
    /// restarts. The next startup reattaches to surviving sessions.
    pub async fn shutdown(&self) {
        info!("Shutting down daemon...");

        self.supervisor.shutdown().await;

        // PID file is best-effort; the lock itself releases on drop.
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                tracing::warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon: lock, load state, build the supervisor.
///
/// Startup recovery (`recover_sessions`) is left to the caller so the
/// log marker and READY handshake can happen between the two.
pub fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Acquire lock file FIRST - prevents races.
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file (truncate now that we hold the lock)
    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file; // Drop mutability

    let store = FileStore::open(&config.state_path)?;

    let servers = match env::ttyd_path() {
        Some(path) => TtydServerAdapter::with_binary(path),
        None => TtydServerAdapter::new(),
    };

    let supervisor = Supervisor::new(
        TmuxMultiplexer::new(),
        servers,
        NoopProvisioner::new(),
        store,
        SystemClock,
    );

    // Seed activity tracking from what the last run persisted.
    supervisor.restore_liveness();

    info!("Daemon started");

    Ok(Daemon {
        config: config.clone(),
        lock_file,
        supervisor,
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
