// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

#[test]
fn stamps_current_schema_version() {
    let doc = migrate_document(json!({ "sessions": [] }));
    assert_eq!(doc["schemaVersion"], SCHEMA_VERSION);
}

#[test]
fn rewrites_legacy_stopped_state() {
    let doc = migrate_document(json!({
        "sessions": [{ "id": "session-1", "intendedState": "stopped" }]
    }));
    assert_eq!(doc["sessions"][0]["intendedState"], "paused");
}

#[parameterized(
    working = { "working", 1000, 1000, 0 },
    done = { "done", 2000, 0, 2000 },
    unknown = { "idle", 3000, 0, 0 },
)]
fn coerces_legacy_hook_status(status: &str, ts: u64, working: u64, done: u64) {
    let doc = migrate_document(json!({
        "sessions": [{
            "id": "session-1",
            "hookStatus": { "status": status, "timestamp": ts }
        }]
    }));
    let hook = &doc["sessions"][0]["hookStatus"];
    assert_eq!(hook["lastWorkingAt"], working);
    assert_eq!(hook["lastDoneAt"], done);
}

#[test]
fn leaves_merged_hook_status_alone() {
    let doc = migrate_document(json!({
        "sessions": [{
            "id": "session-1",
            "hookStatus": { "lastWorkingAt": 5, "lastDoneAt": 9, "timestamp": 9 }
        }]
    }));
    let hook = &doc["sessions"][0]["hookStatus"];
    assert_eq!(hook["lastWorkingAt"], 5);
    assert_eq!(hook["lastDoneAt"], 9);
}

#[test]
fn migrated_document_parses_into_typed_state() {
    let doc = migrate_document(json!({
        "sessions": [{
            "id": "session-1",
            "intendedState": "active",
            "hookStatus": { "status": "working", "timestamp": 1234 },
            "ttydProcess": { "port": 40001, "pid": 99 }
        }]
    }));
    let state: crate::SessionState = serde_json::from_value(doc).unwrap();
    let record = &state.sessions[0];
    assert_eq!(record.liveness.unwrap().last_working_at, 1234);
    assert_eq!(record.persisted_pid(), Some(99));
}
