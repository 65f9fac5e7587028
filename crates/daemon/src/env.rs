// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: DECK_STATE_DIR > XDG_STATE_HOME/deck > ~/.local/state/deck
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("DECK_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("deck"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/deck"))
}

/// Path to the ttyd binary, when the default lookup on PATH is not wanted.
pub fn ttyd_path() -> Option<String> {
    std::env::var("DECK_TTYD_PATH").ok().filter(|s| !s.is_empty())
}

/// Watchdog sweep interval override
pub fn watchdog_interval() -> Option<Duration> {
    std::env::var("DECK_WATCHDOG_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}
