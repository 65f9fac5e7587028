// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store implementations: file-backed (real) and in-memory (tests).

use crate::migration::migrate_document;
use crate::SessionState;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable session store.
///
/// `update` replaces and persists the whole document; callers own the
/// read-modify-write cycle and no merging happens here.
pub trait SessionStore: Send + Sync + 'static {
    /// Current state (a clone; mutations do not write through).
    fn get(&self) -> SessionState;

    /// Replace and persist the whole document, returning what was stored.
    fn update(&self, new_state: SessionState) -> Result<SessionState, StoreError>;
}

/// File-backed store over a single `state.json` document.
#[derive(Clone)]
pub struct FileStore {
    path: PathBuf,
    state: Arc<Mutex<SessionState>>,
}

impl FileStore {
    /// Open the store, migrating the document to the current schema.
    ///
    /// A missing file yields an empty document. A corrupt file is moved
    /// aside to a `.bak` so the supervisor can start with a clean slate
    /// instead of refusing to boot.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = load_document(&path)?;
        info!(
            path = %path.display(),
            sessions = state.sessions.len(),
            "loaded session state"
        );
        Ok(Self {
            path,
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Save atomically (write to .tmp, sync, then rename).
    fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, state)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self) -> SessionState {
        self.state.lock().clone()
    }

    fn update(&self, new_state: SessionState) -> Result<SessionState, StoreError> {
        self.save(&new_state)?;
        *self.state.lock() = new_state.clone();
        Ok(new_state)
    }
}

fn load_document(path: &Path) -> Result<SessionState, StoreError> {
    if !path.exists() {
        return Ok(SessionState {
            schema_version: crate::SCHEMA_VERSION,
            sessions: Vec::new(),
        });
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let raw: serde_json::Value = match serde_json::from_reader(reader) {
        Ok(value) => value,
        Err(e) => {
            let bak_path = rotate_bak_path(path);
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "Corrupt state document, moving to .bak and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            return Ok(SessionState {
                schema_version: crate::SCHEMA_VERSION,
                sessions: Vec::new(),
            });
        }
    };

    Ok(serde_json::from_value(migrate_document(raw))?)
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }
    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

/// In-memory store for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<SessionState>>,
    update_count: Arc<Mutex<usize>>,
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SessionState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            update_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of `update` calls observed (for batching assertions).
    pub fn update_count(&self) -> usize {
        *self.update_count.lock()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl SessionStore for MemoryStore {
    fn get(&self) -> SessionState {
        self.state.lock().clone()
    }

    fn update(&self, new_state: SessionState) -> Result<SessionState, StoreError> {
        *self.update_count.lock() += 1;
        *self.state.lock() = new_state.clone();
        Ok(new_state)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
