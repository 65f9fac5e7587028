// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake multiplexer adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{MultiplexerAdapter, MultiplexerError, PaneDirection, ScrollDirection};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded multiplexer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiplexerCall {
    HasSession { id: String },
    CreateSession { id: String, cwd: Option<PathBuf> },
    KillSession { id: String },
    PanePids { id: String },
    SendKey { id: String, key: String },
    SendText { id: String, text: String },
    Capture { id: String, lines: u32 },
    Scroll { id: String, steps: u32 },
    SelectPane { id: String },
    ExitCopyMode { id: String },
}

#[derive(Debug, Clone, Default)]
struct FakeTerminal {
    pane_pids: Vec<u32>,
    content: String,
}

#[derive(Default)]
struct FakeMultiplexerState {
    terminals: HashMap<String, FakeTerminal>,
    calls: Vec<MultiplexerCall>,
}

/// Fake multiplexer adapter for testing
#[derive(Clone, Default)]
pub struct FakeMultiplexer {
    inner: Arc<Mutex<FakeMultiplexerState>>,
}

impl FakeMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<MultiplexerCall> {
        self.inner.lock().calls.clone()
    }

    /// Add a pre-existing terminal session.
    pub fn add_terminal(&self, id: &str) {
        self.inner
            .lock()
            .terminals
            .insert(id.to_string(), FakeTerminal::default());
    }

    /// Set pane PIDs for a terminal.
    pub fn set_pane_pids(&self, id: &str, pids: Vec<u32>) {
        if let Some(term) = self.inner.lock().terminals.get_mut(id) {
            term.pane_pids = pids;
        }
    }

    /// Set captured content for a terminal.
    pub fn set_content(&self, id: &str, content: &str) {
        if let Some(term) = self.inner.lock().terminals.get_mut(id) {
            term.content = content.to_string();
        }
    }

    pub fn terminal_exists(&self, id: &str) -> bool {
        self.inner.lock().terminals.contains_key(id)
    }
}

#[async_trait]
impl MultiplexerAdapter for FakeMultiplexer {
    async fn has_session(&self, id: &str) -> Result<bool, MultiplexerError> {
        let mut inner = self.inner.lock();
        inner
            .calls
            .push(MultiplexerCall::HasSession { id: id.to_string() });
        Ok(inner.terminals.contains_key(id))
    }

    async fn create_session(&self, id: &str, cwd: Option<&Path>) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::CreateSession {
            id: id.to_string(),
            cwd: cwd.map(Path::to_path_buf),
        });
        inner
            .terminals
            .entry(id.to_string())
            .or_insert_with(FakeTerminal::default);
        Ok(())
    }

    async fn kill_session(&self, id: &str) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner
            .calls
            .push(MultiplexerCall::KillSession { id: id.to_string() });
        inner.terminals.remove(id);
        Ok(())
    }

    async fn pane_pids(&self, id: &str) -> Result<Vec<u32>, MultiplexerError> {
        let mut inner = self.inner.lock();
        inner
            .calls
            .push(MultiplexerCall::PanePids { id: id.to_string() });
        match inner.terminals.get(id) {
            Some(term) => Ok(term.pane_pids.clone()),
            None => Err(MultiplexerError::NotFound(id.to_string())),
        }
    }

    async fn send_key(&self, id: &str, key: &str) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::SendKey {
            id: id.to_string(),
            key: key.to_string(),
        });
        if !inner.terminals.contains_key(id) {
            return Err(MultiplexerError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn send_text(&self, id: &str, text: &str) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::SendText {
            id: id.to_string(),
            text: text.to_string(),
        });
        if !inner.terminals.contains_key(id) {
            return Err(MultiplexerError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn capture(&self, id: &str, lines: u32) -> Result<String, MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::Capture {
            id: id.to_string(),
            lines,
        });
        match inner.terminals.get(id) {
            Some(term) => Ok(term.content.clone()),
            None => Err(MultiplexerError::NotFound(id.to_string())),
        }
    }

    async fn scroll(
        &self,
        id: &str,
        _direction: ScrollDirection,
        steps: u32,
    ) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner.calls.push(MultiplexerCall::Scroll {
            id: id.to_string(),
            steps,
        });
        Ok(())
    }

    async fn select_pane(
        &self,
        id: &str,
        _direction: PaneDirection,
    ) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner
            .calls
            .push(MultiplexerCall::SelectPane { id: id.to_string() });
        Ok(())
    }

    async fn exit_copy_mode(&self, id: &str) -> Result<(), MultiplexerError> {
        let mut inner = self.inner.lock();
        inner
            .calls
            .push(MultiplexerCall::ExitCopyMode { id: id.to_string() });
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
