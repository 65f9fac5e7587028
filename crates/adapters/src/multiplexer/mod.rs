// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multiplexed-terminal (tmux) adapter.
//!
//! The multiplexer owns session content: a tmux session survives both
//! supervisor restarts and terminal-server exits, so its lifecycle is
//! managed separately from the ttyd processes serving it.

mod tmux;

pub use tmux::TmuxMultiplexer;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeMultiplexer, MultiplexerCall};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Control keys a caller may deliver to a session. Everything else must
/// be sent as literal text.
pub const ALLOWED_KEYS: &[&str] = &[
    "M-Enter", "C-c", "C-d", "C-l", "C-u", "Enter", "Escape", "Up", "Down", "Tab", "S-Tab", "BTab",
];

/// Copy-mode scroll direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    fn command(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "scroll-up",
            ScrollDirection::Down => "scroll-down",
        }
    }
}

/// Pane navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneDirection {
    Up,
    Down,
    Left,
    Right,
}

impl PaneDirection {
    fn flag(&self) -> &'static str {
        match self {
            PaneDirection::Up => "-U",
            PaneDirection::Down => "-D",
            PaneDirection::Left => "-L",
            PaneDirection::Right => "-R",
        }
    }
}

/// Errors from multiplexer operations
#[derive(Debug, Error)]
pub enum MultiplexerError {
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("create failed: {0}")]
    CreateFailed(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Adapter for the OS-level terminal multiplexer.
#[async_trait]
pub trait MultiplexerAdapter: Clone + Send + Sync + 'static {
    /// Check whether a session exists.
    async fn has_session(&self, id: &str) -> Result<bool, MultiplexerError>;

    /// Create a detached session named `id`, optionally rooted at `cwd`.
    async fn create_session(&self, id: &str, cwd: Option<&Path>) -> Result<(), MultiplexerError>;

    /// Kill a session. Succeeds if the session is already gone.
    async fn kill_session(&self, id: &str) -> Result<(), MultiplexerError>;

    /// PIDs of every pane process in the session.
    async fn pane_pids(&self, id: &str) -> Result<Vec<u32>, MultiplexerError>;

    /// Send a named control key (caller enforces the allow-list).
    async fn send_key(&self, id: &str, key: &str) -> Result<(), MultiplexerError>;

    /// Send literal text (no key-name interpretation).
    async fn send_text(&self, id: &str, text: &str) -> Result<(), MultiplexerError>;

    /// Capture the last `lines` lines of scrollback.
    async fn capture(&self, id: &str, lines: u32) -> Result<String, MultiplexerError>;

    /// Scroll in copy-mode, entering copy-mode first if needed.
    async fn scroll(
        &self,
        id: &str,
        direction: ScrollDirection,
        steps: u32,
    ) -> Result<(), MultiplexerError>;

    /// Move focus to an adjacent pane.
    async fn select_pane(&self, id: &str, direction: PaneDirection)
        -> Result<(), MultiplexerError>;

    /// Leave copy-mode if the pane is in it.
    async fn exit_copy_mode(&self, id: &str) -> Result<(), MultiplexerError>;
}
