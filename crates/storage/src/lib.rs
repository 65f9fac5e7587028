// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable session store for Deck.
//!
//! The store holds one whole JSON document (`state.json`) containing
//! every session record. Writers read the current document, build a
//! replacement, and call `update` — the store performs no merging.

mod migration;
mod state;
mod store;

#[cfg(any(test, feature = "test-support"))]
pub use store::MemoryStore;
pub use migration::{migrate_document, SCHEMA_VERSION};
pub use state::SessionState;
pub use store::{FileStore, SessionStore, StoreError};
