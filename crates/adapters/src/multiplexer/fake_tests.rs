// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

#[tokio::test]
async fn create_then_has_session() {
    let fake = FakeMultiplexer::new();
    assert!(!fake.has_session("session-1").await.unwrap());

    fake.create_session("session-1", Some(Path::new("/tmp")))
        .await
        .unwrap();
    assert!(fake.has_session("session-1").await.unwrap());

    let calls = fake.calls();
    assert_eq!(
        calls[1],
        MultiplexerCall::CreateSession {
            id: "session-1".to_string(),
            cwd: Some(PathBuf::from("/tmp")),
        }
    );
}

#[tokio::test]
async fn kill_removes_session() {
    let fake = FakeMultiplexer::new();
    fake.add_terminal("session-1");

    fake.kill_session("session-1").await.unwrap();
    assert!(!fake.terminal_exists("session-1"));
}

#[tokio::test]
async fn kill_missing_session_succeeds() {
    let fake = FakeMultiplexer::new();
    fake.kill_session("session-gone").await.unwrap();
}

#[tokio::test]
async fn pane_pids_returns_configured_pids() {
    let fake = FakeMultiplexer::new();
    fake.add_terminal("session-1");
    fake.set_pane_pids("session-1", vec![100, 200]);

    let pids = fake.pane_pids("session-1").await.unwrap();
    assert_eq!(pids, vec![100, 200]);
}

#[tokio::test]
async fn pane_pids_for_missing_session_is_not_found() {
    let fake = FakeMultiplexer::new();
    let err = fake.pane_pids("session-gone").await.unwrap_err();
    assert!(matches!(err, MultiplexerError::NotFound(_)));
}

#[tokio::test]
async fn send_key_to_missing_session_is_not_found() {
    let fake = FakeMultiplexer::new();
    let err = fake.send_key("session-gone", "Enter").await.unwrap_err();
    assert!(matches!(err, MultiplexerError::NotFound(_)));
}

#[tokio::test]
async fn capture_returns_configured_content() {
    let fake = FakeMultiplexer::new();
    fake.add_terminal("session-1");
    fake.set_content("session-1", "$ echo hi\nhi\n");

    let content = fake.capture("session-1", 100).await.unwrap();
    assert_eq!(content, "$ echo hi\nhi\n");
}

#[tokio::test]
async fn records_input_calls_in_order() {
    let fake = FakeMultiplexer::new();
    fake.add_terminal("session-1");

    fake.send_key("session-1", "C-c").await.unwrap();
    fake.send_text("session-1", "ls -la").await.unwrap();
    fake.send_key("session-1", "Enter").await.unwrap();

    let calls = fake.calls();
    assert_eq!(
        calls,
        vec![
            MultiplexerCall::SendKey {
                id: "session-1".to_string(),
                key: "C-c".to_string(),
            },
            MultiplexerCall::SendText {
                id: "session-1".to_string(),
                text: "ls -la".to_string(),
            },
            MultiplexerCall::SendKey {
                id: "session-1".to_string(),
                key: "Enter".to_string(),
            },
        ]
    );
}
