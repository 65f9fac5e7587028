// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::*;
use deck_core::{Engine, IntendedState, TerminalProcess};

fn binding(pid: u32, port: u16, session: &str) -> ObservedBinding {
    ObservedBinding {
        pid,
        port: Some(port),
        session_id: Some(id(session)),
    }
}

#[tokio::test]
async fn kills_servers_for_unprotected_sessions() {
    let h = harness_with(vec![record("session-1", IntendedState::Archived)]);
    h.servers.set_bindings(vec![
        binding(100, 40001, "session-1"),
        binding(200, 40002, "session-2"), // no record at all
    ]);

    h.supervisor.cleanup_orphans().await;

    assert!(!h.servers.pid_alive(100));
    assert!(!h.servers.pid_alive(200));
}

#[tokio::test]
async fn kills_servers_without_a_session_id() {
    let h = harness();
    h.servers.set_bindings(vec![ObservedBinding {
        pid: 300,
        port: Some(7681),
        session_id: None,
    }]);

    h.supervisor.cleanup_orphans().await;

    assert!(!h.servers.pid_alive(300));
}

#[tokio::test]
async fn protects_active_and_paused_sessions() {
    let h = harness_with(vec![
        record("session-1", IntendedState::Active),
        record("session-2", IntendedState::Paused),
    ]);
    h.servers.set_bindings(vec![
        binding(100, 40001, "session-1"),
        binding(200, 40002, "session-2"),
    ]);

    h.supervisor.cleanup_orphans().await;

    assert!(h.servers.pid_alive(100));
    assert!(h.servers.pid_alive(200));
}

#[tokio::test]
async fn duplicates_converge_to_the_in_memory_pid() {
    let h = harness_with(vec![record("session-1", IntendedState::Active)]);
    h.servers.set_bindings(vec![
        binding(100, 40001, "session-1"),
        binding(200, 40002, "session-1"),
        binding(300, 40003, "session-1"),
    ]);
    h.supervisor.adopt_server(&id("session-1"), 40002, 200);

    h.supervisor.cleanup_orphans().await;

    assert!(!h.servers.pid_alive(100));
    assert!(h.servers.pid_alive(200));
    assert!(!h.servers.pid_alive(300));
}

#[tokio::test]
async fn duplicates_converge_to_the_persisted_pid_without_in_memory() {
    let mut r = record("session-1", IntendedState::Active);
    r.terminal_process = Some(TerminalProcess {
        port: 40001,
        pid: 100,
        started_at: None,
        engine: Engine::Claude,
    });
    let h = harness_with(vec![r]);
    h.servers.set_bindings(vec![
        binding(100, 40001, "session-1"),
        binding(200, 40002, "session-1"),
    ]);

    h.supervisor.cleanup_orphans().await;

    assert!(h.servers.pid_alive(100));
    assert!(!h.servers.pid_alive(200));
}

#[tokio::test]
async fn duplicates_fall_back_to_newest_pid_and_persist_the_correction() {
    let h = harness_with(vec![record("session-1", IntendedState::Paused)]);
    h.servers.set_bindings(vec![
        binding(100, 40001, "session-1"),
        binding(200, 40002, "session-1"),
    ]);

    h.supervisor.cleanup_orphans().await;

    assert!(!h.servers.pid_alive(100));
    assert!(h.servers.pid_alive(200));
    let rec = h.store.get().session(&id("session-1")).cloned().unwrap();
    assert_eq!(rec.persisted_pid(), Some(200));
    assert_eq!(rec.persisted_port(), Some(40002));
}

#[tokio::test]
async fn single_protected_binding_is_untouched() {
    let h = harness_with(vec![record("session-1", IntendedState::Active)]);
    h.servers.set_bindings(vec![binding(100, 40001, "session-1")]);

    h.supervisor.cleanup_orphans().await;

    assert!(h.servers.pid_alive(100));
    // No correction write either.
    assert_eq!(h.store.update_count(), 0);
}

#[tokio::test]
async fn cleanup_is_idempotent() {
    let h = harness_with(vec![record("session-1", IntendedState::Active)]);
    h.servers.set_bindings(vec![
        binding(100, 40001, "session-1"),
        binding(200, 40002, "session-1"),
    ]);

    h.supervisor.cleanup_orphans().await;
    h.supervisor.cleanup_orphans().await;

    assert!(h.servers.pid_alive(200));
    assert!(!h.servers.pid_alive(100));
}

#[tokio::test]
async fn teardown_collects_descendants_before_killing_the_session() {
    let h = harness();
    h.multiplexer.add_terminal("session-1");
    h.multiplexer.set_pane_pids("session-1", vec![500]);
    h.servers.add_external_pid(500);
    h.servers.set_child_pids(500, vec![501]);
    h.servers.set_child_pids(501, vec![502]);

    teardown_session_tree(&h.multiplexer, &h.servers, &id("session-1")).await;

    assert!(!h.multiplexer.terminal_exists("session-1"));
    for pid in [500, 501, 502] {
        assert!(!h.servers.pid_alive(pid), "pid {} survived teardown", pid);
    }
}

#[tokio::test]
async fn teardown_force_kills_term_immune_processes() {
    let h = harness();
    h.multiplexer.add_terminal("session-1");
    h.multiplexer.set_pane_pids("session-1", vec![500]);
    h.servers.add_external_pid(500);
    h.servers.make_term_immune(500);

    teardown_session_tree(&h.multiplexer, &h.servers, &id("session-1")).await;

    assert!(!h.servers.pid_alive(500));
}

#[tokio::test]
async fn teardown_of_missing_session_is_a_noop() {
    let h = harness();
    teardown_session_tree(&h.multiplexer, &h.servers, &id("session-9")).await;
}
