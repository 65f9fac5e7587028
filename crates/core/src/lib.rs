// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! deck-core: Domain types for the Deck session supervisor

pub mod clock;
pub mod engine;
pub mod id;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
pub use clock::{epoch_ms_now, Clock, SystemClock};
pub use engine::Engine;
pub use id::SessionId;
pub use session::{
    ActivityStatus, IntendedState, Liveness, SessionRecord, TerminalProcess, WorkspaceRef,
};
