// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::*;
use chrono::Duration;
use deck_core::WorkspaceRef;

#[tokio::test]
async fn paused_ttl_destroys_multiplexer_and_stamps_record() {
    let mut r = record("session-1", IntendedState::Paused);
    let h = harness_with(Vec::new());
    r.paused_at = Some(h.clock.now() - Duration::hours(25));
    let mut state = h.store.get();
    state.upsert(r);
    h.store.update(state).unwrap();
    h.multiplexer.add_terminal("session-1");

    h.supervisor.sweep_paused_ttl().await;

    assert!(!h.multiplexer.terminal_exists("session-1"));
    let rec = h.store.get().session(&id("session-1")).cloned().unwrap();
    assert!(rec.multiplexer_cleared_at.is_some());
    // The record itself survives.
    assert_eq!(rec.intended_state, IntendedState::Paused);
}

#[tokio::test]
async fn paused_ttl_skips_fresh_and_already_cleared_sessions() {
    let h = harness_with(Vec::new());
    let mut fresh = record("session-1", IntendedState::Paused);
    fresh.paused_at = Some(h.clock.now() - Duration::hours(1));
    let mut cleared = record("session-2", IntendedState::Paused);
    cleared.paused_at = Some(h.clock.now() - Duration::hours(48));
    cleared.multiplexer_cleared_at = Some(h.clock.now() - Duration::hours(24));
    let mut state = h.store.get();
    state.upsert(fresh);
    state.upsert(cleared);
    h.store.update(state).unwrap();
    h.multiplexer.add_terminal("session-1");
    h.multiplexer.add_terminal("session-2");

    h.supervisor.sweep_paused_ttl().await;

    assert!(h.multiplexer.terminal_exists("session-1"));
    assert!(h.multiplexer.terminal_exists("session-2"));
    assert!(h
        .store
        .get()
        .session(&id("session-1"))
        .unwrap()
        .multiplexer_cleared_at
        .is_none());
}

#[tokio::test]
async fn paused_ttl_ignores_missing_multiplexer_session() {
    let h = harness_with(Vec::new());
    let mut r = record("session-1", IntendedState::Paused);
    r.paused_at = Some(h.clock.now() - Duration::hours(25));
    let mut state = h.store.get();
    state.upsert(r);
    h.store.update(state).unwrap();
    // No terminal exists; the kill is best-effort and the stamp still
    // lands so the sweep never revisits.
    h.supervisor.sweep_paused_ttl().await;

    assert!(h
        .store
        .get()
        .session(&id("session-1"))
        .unwrap()
        .multiplexer_cleared_at
        .is_some());
}

#[tokio::test]
async fn archived_ttl_deletes_record_and_requests_workspace_removal() {
    let h = harness_with(Vec::new());
    let mut r = record("session-1", IntendedState::Archived);
    r.archived_at = Some(h.clock.now() - Duration::days(31));
    r.workspace = Some(WorkspaceRef {
        path: Some("/work/session-1".into()),
        repo: Some("org/repo".to_string()),
    });
    let mut state = h.store.get();
    state.upsert(r);
    h.store.update(state).unwrap();

    h.supervisor.sweep_archived_ttl().await;
    // Removal is spawned fire-and-forget; give it a beat.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(h.store.get().session(&id("session-1")).is_none());
    let removals = h.provisioner.removals();
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].session_id, "session-1");
    assert_eq!(removals[0].workspace.repo.as_deref(), Some("org/repo"));
}

#[tokio::test]
async fn archived_ttl_deletion_survives_provisioner_failure() {
    let h = harness_with(Vec::new());
    let mut r = record("session-1", IntendedState::Archived);
    r.archived_at = Some(h.clock.now() - Duration::days(31));
    r.workspace = Some(WorkspaceRef::default());
    let mut state = h.store.get();
    state.upsert(r);
    h.store.update(state).unwrap();
    h.provisioner.fail_all();

    h.supervisor.sweep_archived_ttl().await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(h.store.get().session(&id("session-1")).is_none());
}

#[tokio::test]
async fn archived_ttl_keeps_young_records() {
    let h = harness_with(Vec::new());
    let mut r = record("session-1", IntendedState::Archived);
    r.archived_at = Some(h.clock.now() - Duration::days(7));
    let mut state = h.store.get();
    state.upsert(r);
    h.store.update(state).unwrap();

    h.supervisor.sweep_archived_ttl().await;

    assert!(h.store.get().session(&id("session-1")).is_some());
    assert!(h.provisioner.removals().is_empty());
}

#[tokio::test]
async fn archived_ttl_drops_liveness_with_the_record() {
    let h = harness_with(Vec::new());
    let mut r = record("session-1", IntendedState::Archived);
    r.archived_at = Some(h.clock.now() - Duration::days(31));
    let mut state = h.store.get();
    state.upsert(r);
    h.store.update(state).unwrap();
    h.supervisor
        .report_activity(&id("session-1"), deck_core::ActivityStatus::Done, NOW_MS);

    h.supervisor.sweep_ttls().await;

    assert!(h.supervisor.session_status().is_empty());
}
