// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace provisioner collaborator.
//!
//! Workspace lifecycle belongs to an external provisioner; the
//! supervisor only forwards removal requests when an archived session
//! ages out. Removal is fire-and-forget: a failed removal must never
//! block or fail the session GC that requested it.

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProvisioner, RemovalRequest};

use async_trait::async_trait;
use deck_core::WorkspaceRef;
use thiserror::Error;

/// Errors from workspace removal
#[derive(Debug, Error)]
pub enum ProvisionerError {
    #[error("removal failed: {0}")]
    RemovalFailed(String),
}

/// Forwards workspace removal requests to whatever owns workspaces.
#[async_trait]
pub trait WorkspaceProvisioner: Clone + Send + Sync + 'static {
    async fn remove(&self, session_id: &str, workspace: &WorkspaceRef)
        -> Result<(), ProvisionerError>;
}

/// Provisioner that only logs. Used when no external workspace service
/// is wired in.
#[derive(Clone, Default)]
pub struct NoopProvisioner;

impl NoopProvisioner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl WorkspaceProvisioner for NoopProvisioner {
    async fn remove(
        &self,
        session_id: &str,
        workspace: &WorkspaceRef,
    ) -> Result<(), ProvisionerError> {
        tracing::info!(
            session_id,
            path = ?workspace.path,
            repo = ?workspace.repo,
            "workspace removal requested (no provisioner configured)"
        );
        Ok(())
    }
}
