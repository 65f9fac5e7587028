// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake workspace provisioner for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ProvisionerError, WorkspaceProvisioner};
use async_trait::async_trait;
use deck_core::WorkspaceRef;
use parking_lot::Mutex;
use std::sync::Arc;

/// Recorded removal request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalRequest {
    pub session_id: String,
    pub workspace: WorkspaceRef,
}

#[derive(Default)]
struct FakeProvisionerState {
    removals: Vec<RemovalRequest>,
    fail_all: bool,
}

/// Fake workspace provisioner for testing
#[derive(Clone, Default)]
pub struct FakeProvisioner {
    inner: Arc<Mutex<FakeProvisionerState>>,
}

impl FakeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded removal requests
    pub fn removals(&self) -> Vec<RemovalRequest> {
        self.inner.lock().removals.clone()
    }

    /// Make every removal fail. Callers are expected to shrug it off.
    pub fn fail_all(&self) {
        self.inner.lock().fail_all = true;
    }
}

#[async_trait]
impl WorkspaceProvisioner for FakeProvisioner {
    async fn remove(
        &self,
        session_id: &str,
        workspace: &WorkspaceRef,
    ) -> Result<(), ProvisionerError> {
        let mut inner = self.inner.lock();
        inner.removals.push(RemovalRequest {
            session_id: session_id.to_string(),
            workspace: workspace.clone(),
        });
        if inner.fail_all {
            return Err(ProvisionerError::RemovalFailed("forced failure".to_string()));
        }
        Ok(())
    }
}
