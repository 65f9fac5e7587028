// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ttyd terminal-server adapter

use super::{ObservedBinding, ServerError, ServerSpawnSpec, SpawnedServer, TerminalServerAdapter};
use crate::subprocess::{run_with_timeout, PROC_QUERY_TIMEOUT, SIGNAL_TIMEOUT};
use async_trait::async_trait;
use deck_core::SessionId;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;

/// ttyd-based terminal-server adapter
#[derive(Clone)]
pub struct TtydServerAdapter {
    ttyd_path: String,
}

impl Default for TtydServerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TtydServerAdapter {
    pub fn new() -> Self {
        Self {
            ttyd_path: "ttyd".to_string(),
        }
    }

    /// Use a specific ttyd binary instead of resolving from PATH.
    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            ttyd_path: path.into(),
        }
    }

    fn binary_name(&self) -> &str {
        self.ttyd_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.ttyd_path)
    }
}

#[async_trait]
impl TerminalServerAdapter for TtydServerAdapter {
    async fn spawn(&self, spec: &ServerSpawnSpec) -> Result<SpawnedServer, ServerError> {
        let id = &spec.session_id;
        let mut cmd = Command::new(&self.ttyd_path);
        // -o bounds descriptor leakage: the server dies with its sole
        // client and the supervisor respawns on demand.
        cmd.arg("-p")
            .arg(spec.port.to_string())
            .arg("-W")
            .arg("-o")
            .arg("-m")
            .arg("1")
            .arg("-b")
            .arg(id.proxy_path())
            .arg("-t")
            .arg("disableReconnect=true")
            .arg("tmux")
            .arg("new-session")
            .arg("-A")
            .arg("-s")
            .arg(&id.0);
        if let Some(dir) = &spec.working_directory {
            cmd.current_dir(dir);
        }
        // Agents render UTF-8 box drawing; a POSIX locale garbles it.
        cmd.env("LANG", "en_US.UTF-8").env("LC_ALL", "en_US.UTF-8");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // New process group so the server survives us and never receives
        // our terminal signals.
        cmd.process_group(0);
        cmd.kill_on_drop(false);

        let mut child = cmd
            .spawn()
            .map_err(|e| ServerError::SpawnFailed(format!("{}: {}", self.ttyd_path, e)))?;
        let pid = child
            .id()
            .ok_or_else(|| ServerError::SpawnFailed("child exited before pid read".to_string()))?;

        if let Some(stdout) = child.stdout.take() {
            let session_id = id.0.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(session_id = %session_id, "ttyd: {}", line);
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let session_id = id.0.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(session_id = %session_id, "ttyd: {}", line);
                }
            });
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(_) => None,
            };
            let _ = tx.send(code);
        });

        Ok(SpawnedServer { pid, exited: rx })
    }

    async fn list_bindings(&self) -> Result<Vec<ObservedBinding>, ServerError> {
        let mut cmd = Command::new("ps");
        cmd.args(["-eo", "pid=,args="]);
        let output = run_with_timeout(cmd, PROC_QUERY_TIMEOUT, "ps scan")
            .await
            .map_err(ServerError::QueryFailed)?;
        if !output.status.success() {
            return Err(ServerError::QueryFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(parse_bindings(
            &String::from_utf8_lossy(&output.stdout),
            self.binary_name(),
        ))
    }

    async fn is_pid_alive(&self, pid: u32) -> bool {
        let mut cmd = Command::new("kill");
        cmd.args(["-0", &pid.to_string()]);
        matches!(
            run_with_timeout(cmd, SIGNAL_TIMEOUT, "pid probe").await,
            Ok(output) if output.status.success()
        )
    }

    async fn terminate(&self, pid: u32) {
        signal(pid, "-TERM").await;
    }

    async fn kill(&self, pid: u32) {
        signal(pid, "-KILL").await;
    }

    async fn child_pids(&self, pid: u32) -> Vec<u32> {
        let mut cmd = Command::new("pgrep");
        cmd.args(["-P", &pid.to_string()]);
        match run_with_timeout(cmd, PROC_QUERY_TIMEOUT, "pgrep children").await {
            Ok(output) => String::from_utf8_lossy(&output.stdout)
                .lines()
                .filter_map(|line| line.trim().parse::<u32>().ok())
                .collect(),
            Err(err) => {
                tracing::debug!(pid, error = %err, "child pid query failed");
                Vec::new()
            }
        }
    }
}

async fn signal(pid: u32, sig: &str) {
    let mut cmd = Command::new("kill");
    cmd.args([sig, &pid.to_string()]);
    // Failure usually means the process is already gone.
    if let Err(err) = run_with_timeout(cmd, SIGNAL_TIMEOUT, "kill").await {
        tracing::debug!(pid, signal = sig, error = %err, "signal delivery failed");
    }
}

/// Parse `ps -eo pid=,args=` output into terminal-server bindings.
///
/// A line counts when argv[0]'s basename is the server binary. Port and
/// session id come from the `-p` and `-b /console/<id>` arguments; a
/// session id only counts when it has the `session-<digits>` shape, so
/// foreign ttyd invocations surface as orphan bindings instead of being
/// attributed to a session.
fn parse_bindings(ps_output: &str, binary: &str) -> Vec<ObservedBinding> {
    let mut bindings = Vec::new();
    for line in ps_output.lines() {
        let mut tokens = line.split_whitespace();
        let Some(pid) = tokens.next().and_then(|t| t.parse::<u32>().ok()) else {
            continue;
        };
        let Some(argv0) = tokens.next() else {
            continue;
        };
        if argv0.rsplit('/').next() != Some(binary) {
            continue;
        }

        let rest: Vec<&str> = tokens.collect();
        let mut port = None;
        let mut session_id = None;
        let mut iter = rest.iter().peekable();
        while let Some(token) = iter.next() {
            match *token {
                "-p" => {
                    port = iter.peek().and_then(|t| t.parse::<u16>().ok());
                }
                "-b" => {
                    session_id = iter
                        .peek()
                        .and_then(|t| t.strip_prefix("/console/"))
                        .filter(|id| is_session_id(id))
                        .map(|id| SessionId(id.to_string()));
                }
                _ => {}
            }
        }
        bindings.push(ObservedBinding {
            pid,
            port,
            session_id,
        });
    }
    bindings
}

fn is_session_id(candidate: &str) -> bool {
    match candidate.strip_prefix("session-") {
        Some(suffix) => !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
#[path = "ttyd_tests.rs"]
mod tests;
