// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

/// Random prefix for this test run to avoid conflicts with parallel test runs.
static TEST_PREFIX: LazyLock<String> = LazyLock::new(|| {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    format!("t{:04x}", nanos & 0xFFFF)
});

/// Counter for generating unique session names across parallel tests.
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique session name for testing.
fn unique_name(suffix: &str) -> String {
    let id = SESSION_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}-{}", *TEST_PREFIX, suffix, id)
}

/// Check if tmux is available on this system
fn tmux_available() -> bool {
    std::process::Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! fail_if_no_tmux {
    () => {
        if !tmux_available() {
            panic!("tmux is required but not available");
        }
    };
}

#[tokio::test]
#[serial(tmux)]
async fn create_session_then_has_session() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    let name = unique_name("create");

    assert!(!mux.has_session(&name).await.unwrap());
    mux.create_session(&name, Some(Path::new("/tmp")))
        .await
        .unwrap();
    assert!(mux.has_session(&name).await.unwrap());

    // Cleanup
    mux.kill_session(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn create_session_is_idempotent() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    let name = unique_name("idem");

    mux.create_session(&name, None).await.unwrap();
    // Second create must not fail: the session already exists.
    mux.create_session(&name, None).await.unwrap();

    mux.kill_session(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn create_session_rejects_missing_cwd() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    let name = unique_name("badcwd");

    let err = mux
        .create_session(&name, Some(Path::new("/nonexistent/deck/dir")))
        .await
        .unwrap_err();
    assert!(matches!(err, MultiplexerError::CreateFailed(_)));
    assert!(!mux.has_session(&name).await.unwrap());
}

#[tokio::test]
#[serial(tmux)]
async fn kill_session_removes_it() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    let name = unique_name("kill");

    mux.create_session(&name, None).await.unwrap();
    mux.kill_session(&name).await.unwrap();
    assert!(!mux.has_session(&name).await.unwrap());
}

#[tokio::test]
#[serial(tmux)]
async fn kill_missing_session_succeeds() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    mux.kill_session(&unique_name("ghost")).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn pane_pids_returns_at_least_one_pid() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    let name = unique_name("pids");

    mux.create_session(&name, None).await.unwrap();
    let pids = mux.pane_pids(&name).await.unwrap();
    assert!(!pids.is_empty());
    for pid in &pids {
        assert!(*pid > 1);
    }

    mux.kill_session(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn pane_pids_for_missing_session_is_not_found() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    let err = mux.pane_pids(&unique_name("nopids")).await.unwrap_err();
    assert!(matches!(err, MultiplexerError::NotFound(_)));
}

#[tokio::test]
#[serial(tmux)]
async fn send_text_appears_in_capture() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    let name = unique_name("text");

    mux.create_session(&name, None).await.unwrap();
    mux.send_text(&name, "echo deck_marker_xyz").await.unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let content = mux.capture(&name, 100).await.unwrap();
    assert!(content.contains("deck_marker_xyz"), "got: {}", content);

    mux.kill_session(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn send_text_with_leading_dash_is_literal() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    let name = unique_name("dash");

    mux.create_session(&name, None).await.unwrap();
    mux.send_text(&name, "-la --color").await.unwrap();
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    let content = mux.capture(&name, 100).await.unwrap();
    assert!(content.contains("-la --color"), "got: {}", content);

    mux.kill_session(&name).await.unwrap();
}

#[tokio::test]
#[serial(tmux)]
async fn scroll_and_exit_copy_mode() {
    fail_if_no_tmux!();
    let mux = TmuxMultiplexer::new();
    let name = unique_name("scroll");

    mux.create_session(&name, None).await.unwrap();
    // Entering copy-mode and scrolling must not error even with an
    // empty scrollback.
    mux.scroll(&name, ScrollDirection::Up, 3).await.unwrap();
    mux.exit_copy_mode(&name).await.unwrap();
    // Exiting again when not in copy-mode is a no-op.
    mux.exit_copy_mode(&name).await.unwrap();

    mux.kill_session(&name).await.unwrap();
}
