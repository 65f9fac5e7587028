// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keeper selection among duplicate terminal-server processes.

/// Pick the one process to keep for a session out of `candidates`.
///
/// Preference order: the PID this supervisor instance is tracking in
/// memory, then the PID persisted in the session record, then the
/// highest (newest) PID. Returns `None` only for an empty candidate
/// list.
pub fn choose_keeper(
    candidates: &[u32],
    in_memory_pid: Option<u32>,
    persisted_pid: Option<u32>,
) -> Option<u32> {
    if let Some(pid) = in_memory_pid {
        if candidates.contains(&pid) {
            return Some(pid);
        }
    }
    if let Some(pid) = persisted_pid {
        if candidates.contains(&pid) {
            return Some(pid);
        }
    }
    candidates.iter().max().copied()
}

#[cfg(test)]
#[path = "keeper_tests.rs"]
mod tests;
