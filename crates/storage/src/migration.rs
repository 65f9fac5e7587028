// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migrate-on-load normalization for the state document.
//!
//! Older documents carried a `hookStatus` of `{status, timestamp}`
//! instead of merged `{lastWorkingAt, lastDoneAt}` timestamps, and an
//! `intendedState` of `"stopped"`. Migration rewrites those shapes so
//! the typed records parse with full information; it never drops
//! fields it does not understand.

use serde_json::Value;

/// Current document schema version.
pub const SCHEMA_VERSION: u32 = 3;

/// Normalize a raw state document to the current schema.
pub fn migrate_document(mut doc: Value) -> Value {
    if let Some(sessions) = doc.get_mut("sessions").and_then(Value::as_array_mut) {
        for session in sessions.iter_mut() {
            migrate_session(session);
        }
    }

    if let Some(obj) = doc.as_object_mut() {
        obj.insert("schemaVersion".into(), SCHEMA_VERSION.into());
    }

    doc
}

fn migrate_session(session: &mut Value) {
    let Some(obj) = session.as_object_mut() else {
        return;
    };

    // "stopped" predates the paused/archived split; it was paused in intent.
    if obj.get("intendedState").and_then(Value::as_str) == Some("stopped") {
        obj.insert("intendedState".into(), "paused".into());
    }

    if let Some(hook) = obj.get_mut("hookStatus") {
        migrate_hook_status(hook);
    }
}

/// Coerce a legacy `{status, timestamp}` hook record into merged
/// timestamps. Records that already carry them are left alone.
fn migrate_hook_status(hook: &mut Value) {
    let Some(obj) = hook.as_object_mut() else {
        return;
    };
    if obj.contains_key("lastWorkingAt") || obj.contains_key("lastDoneAt") {
        return;
    }

    let timestamp = obj.get("timestamp").and_then(Value::as_u64).unwrap_or(0);
    let status = obj.get("status").and_then(Value::as_str).unwrap_or("");
    let (working, done) = match status {
        "working" => (timestamp, 0),
        "done" => (0, timestamp),
        _ => (0, 0),
    };

    obj.insert("lastWorkingAt".into(), working.into());
    obj.insert("lastDoneAt".into(), done.into());
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
