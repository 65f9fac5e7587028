// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux multiplexer adapter

use super::{MultiplexerAdapter, MultiplexerError, PaneDirection, ScrollDirection};
use crate::subprocess::{run_with_timeout, TMUX_TIMEOUT};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Tmux-based multiplexer adapter
#[derive(Clone, Default)]
pub struct TmuxMultiplexer;

impl TmuxMultiplexer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MultiplexerAdapter for TmuxMultiplexer {
    async fn has_session(&self, id: &str) -> Result<bool, MultiplexerError> {
        let mut cmd = Command::new("tmux");
        cmd.args(["has-session", "-t", id]);
        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux has-session")
            .await
            .map_err(MultiplexerError::CommandFailed)?;
        Ok(output.status.success())
    }

    async fn create_session(&self, id: &str, cwd: Option<&Path>) -> Result<(), MultiplexerError> {
        if let Some(cwd) = cwd {
            if !cwd.exists() {
                return Err(MultiplexerError::CreateFailed(format!(
                    "working directory does not exist: {}",
                    cwd.display()
                )));
            }
        }

        let mut cmd = Command::new("tmux");
        cmd.args(["new-session", "-d", "-s", id]);
        if let Some(cwd) = cwd {
            cmd.arg("-c").arg(cwd);
        }

        let output = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux new-session")
            .await
            .map_err(MultiplexerError::CreateFailed)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // "duplicate session" means someone else created it between our
            // has-session check and now — the session exists, which is what
            // the caller asked for.
            if stderr.contains("duplicate session") {
                tracing::debug!(session_id = id, "session already exists");
                return Ok(());
            }
            tracing::error!(session_id = id, stderr = %stderr, "tmux create failed");
            return Err(MultiplexerError::CreateFailed(stderr.to_string()));
        }

        Ok(())
    }

    async fn kill_session(&self, id: &str) -> Result<(), MultiplexerError> {
        // Ignore failure — session might already be dead, which is fine
        let mut cmd = Command::new("tmux");
        cmd.args(["kill-session", "-t", id]);
        let _ = run_with_timeout(cmd, TMUX_TIMEOUT, "tmux kill-session").await;
        Ok(())
    }

    async fn pane_pids(&self, id: &str) -> Result<Vec<u32>, MultiplexerError> {
        let output = tmux_output(
            &["list-panes", "-s", "-t", id, "-F", "#{pane_pid}"],
            "tmux list-panes",
        )
        .await?;

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter_map(|line| line.trim().parse::<u32>().ok())
            .collect())
    }

    async fn send_key(&self, id: &str, key: &str) -> Result<(), MultiplexerError> {
        tmux_run(&["send-keys", "-t", id, key], "tmux send-keys").await
    }

    async fn send_text(&self, id: &str, text: &str) -> Result<(), MultiplexerError> {
        // -l = literal mode (no key name interpretation)
        // -- = end of options (handles text starting with -)
        tmux_run(
            &["send-keys", "-t", id, "-l", "--", text],
            "tmux send-keys literal",
        )
        .await
    }

    async fn capture(&self, id: &str, lines: u32) -> Result<String, MultiplexerError> {
        let lines_arg = format!("-{}", lines);
        // -J joins wrapped lines so callers see logical lines
        let output = tmux_output(
            &["capture-pane", "-t", id, "-p", "-J", "-S", &lines_arg],
            "tmux capture-pane",
        )
        .await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn scroll(
        &self,
        id: &str,
        direction: ScrollDirection,
        steps: u32,
    ) -> Result<(), MultiplexerError> {
        let steps = steps.clamp(1, 10);
        let scroll_cmd = format!(
            "send-keys -t \"{}\" -X -N {} {}",
            id,
            steps,
            direction.command()
        );
        let enter_then_scroll = format!("copy-mode -t \"{}\"; {}", id, scroll_cmd);
        tmux_run(
            &[
                "if-shell",
                "-F",
                "#{pane_in_mode}",
                &scroll_cmd,
                &enter_then_scroll,
            ],
            "tmux scroll",
        )
        .await
    }

    async fn select_pane(
        &self,
        id: &str,
        direction: PaneDirection,
    ) -> Result<(), MultiplexerError> {
        tmux_run(
            &["select-pane", "-t", id, direction.flag()],
            "tmux select-pane",
        )
        .await
    }

    async fn exit_copy_mode(&self, id: &str) -> Result<(), MultiplexerError> {
        let cancel = format!("send-keys -t \"{}\" -X cancel", id);
        tmux_run(
            &["if-shell", "-F", "#{pane_in_mode}", &cancel, ""],
            "tmux exit copy-mode",
        )
        .await
    }
}

/// Run a tmux command, returning `NotFound` on failure (discards output).
async fn tmux_run(args: &[&str], description: &str) -> Result<(), MultiplexerError> {
    tmux_output(args, description).await.map(|_| ())
}

/// Run a tmux command and return the output, returning `NotFound` on failure.
async fn tmux_output(
    args: &[&str],
    description: &str,
) -> Result<std::process::Output, MultiplexerError> {
    let mut cmd = Command::new("tmux");
    cmd.args(args);
    let output = run_with_timeout(cmd, TMUX_TIMEOUT, description)
        .await
        .map_err(MultiplexerError::CommandFailed)?;
    if !output.status.success() {
        let session_id = args
            .windows(2)
            .find(|w| w[0] == "-t")
            .map(|w| w[1])
            .unwrap_or("unknown");
        return Err(MultiplexerError::NotFound(session_id.to_string()));
    }
    Ok(output)
}

#[cfg(test)]
#[path = "tmux_tests.rs"]
mod tests;
