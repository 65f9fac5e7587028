// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! OS adapters for Deck: tmux, ttyd, the process table, and the
//! workspace provisioner. Everything that shells out lives here so the
//! supervisor's algorithms only ever see typed results.

pub mod multiplexer;
pub mod server;
pub mod subprocess;
pub mod workspace;

pub use multiplexer::{
    MultiplexerAdapter, MultiplexerError, PaneDirection, ScrollDirection, TmuxMultiplexer,
    ALLOWED_KEYS,
};
pub use server::{
    ObservedBinding, ServerError, ServerSpawnSpec, SpawnedServer, TerminalServerAdapter,
    TtydServerAdapter,
};
pub use workspace::{NoopProvisioner, ProvisionerError, WorkspaceProvisioner};

#[cfg(any(test, feature = "test-support"))]
pub use multiplexer::{FakeMultiplexer, MultiplexerCall};
#[cfg(any(test, feature = "test-support"))]
pub use server::{FakeServerAdapter, ServerCall};
#[cfg(any(test, feature = "test-support"))]
pub use workspace::{FakeProvisioner, RemovalRequest};
