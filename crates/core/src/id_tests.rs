// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn generate_uses_epoch_ms_shape() {
    let id = SessionId::generate(1_700_000_000_123);
    assert_eq!(id.as_str(), "session-1700000000123");
}

#[test]
fn proxy_path_embeds_id() {
    let id = SessionId::new("session-42");
    assert_eq!(id.proxy_path(), "/console/session-42");
}

#[test]
fn compares_against_str() {
    let id = SessionId::new("session-1");
    assert_eq!(id, *"session-1");
    assert_eq!(id, "session-1");
    assert_eq!(id.to_string(), "session-1");
}

#[test]
fn serde_roundtrip_is_a_plain_string() {
    let id = SessionId::new("session-7");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"session-7\"");
    let back: SessionId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}
