// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn returns_candidate_when_free() {
    // Grab an ephemeral port, release it, then ask for it back.
    let listener = TcpListener::bind(("0.0.0.0", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    assert_eq!(find_free_port(port).await.unwrap(), port);
}

#[tokio::test]
async fn skips_past_a_port_in_use() {
    let listener = TcpListener::bind(("0.0.0.0", 0)).await.unwrap();
    let occupied = listener.local_addr().unwrap().port();

    let found = find_free_port(occupied).await.unwrap();
    assert!(found > occupied);
}

#[tokio::test]
async fn found_port_is_actually_bindable() {
    let port = find_free_port(PORT_BASE).await.unwrap();
    let listener = TcpListener::bind(("0.0.0.0", port)).await.unwrap();
    assert_eq!(listener.local_addr().unwrap().port(), port);
}
