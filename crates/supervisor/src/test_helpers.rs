// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixtures for supervisor tests.

use crate::supervisor::{StartRequest, Supervisor};
use deck_adapters::{FakeMultiplexer, FakeProvisioner, FakeServerAdapter};
use deck_core::{Engine, FakeClock, IntendedState, SessionId, SessionRecord};
use deck_storage::{MemoryStore, SessionState};

/// A stable "now" for tests: 2023-11-14T22:13:20Z.
pub const NOW_MS: u64 = 1_700_000_000_000;

pub type TestSupervisor =
    Supervisor<FakeMultiplexer, FakeServerAdapter, FakeProvisioner, MemoryStore, FakeClock>;

pub struct Harness {
    pub supervisor: TestSupervisor,
    pub multiplexer: FakeMultiplexer,
    pub servers: FakeServerAdapter,
    pub provisioner: FakeProvisioner,
    pub store: MemoryStore,
    pub clock: FakeClock,
}

pub fn harness_with(records: Vec<SessionRecord>) -> Harness {
    let multiplexer = FakeMultiplexer::new();
    let servers = FakeServerAdapter::new();
    let provisioner = FakeProvisioner::new();
    let store = MemoryStore::with_state(SessionState {
        schema_version: deck_storage::SCHEMA_VERSION,
        sessions: records,
    });
    let clock = FakeClock::new(NOW_MS);
    let supervisor = Supervisor::new(
        multiplexer.clone(),
        servers.clone(),
        provisioner.clone(),
        store.clone(),
        clock.clone(),
    );
    Harness {
        supervisor,
        multiplexer,
        servers,
        provisioner,
        store,
        clock,
    }
}

pub fn harness() -> Harness {
    harness_with(Vec::new())
}

pub fn id(s: &str) -> SessionId {
    SessionId::new(s)
}

pub fn record(session_id: &str, state: IntendedState) -> SessionRecord {
    let mut r = SessionRecord::new(id(session_id), Engine::Claude, None);
    r.intended_state = state;
    r
}

pub fn start_request(session_id: &str) -> StartRequest {
    StartRequest {
        session_id: id(session_id),
        working_directory: None,
        initial_command: None,
        engine: Engine::Claude,
        preferred_port: None,
    }
}
