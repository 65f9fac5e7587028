// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! deck-supervisor: the session process supervisor.
//!
//! Owns the in-memory active-session table and liveness tracker,
//! composes the OS adapters, and converges durable records, the OS
//! process table, and its own view of the world on every boot. All
//! mutations to the store go through read-modify-write cycles here;
//! the store itself never merges.

#[cfg(test)]
mod test_helpers;

pub mod cleanup;
pub mod keeper;
pub mod liveness;
pub mod ports;
pub mod reconcile;
pub mod supervisor;
pub mod ttl;

pub use keeper::choose_keeper;
pub use liveness::{LivenessTracker, SessionStatus, HEARTBEAT_TIMEOUT_MS};
pub use ports::{find_free_port, PORT_BASE};
pub use supervisor::{RuntimeStatus, StartOutcome, StartRequest, Supervisor, SupervisorError};
