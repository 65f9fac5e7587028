// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifier type.
//!
//! A SessionId names every OS resource a session owns: it is the tmux
//! session name, the terminal-server base path segment
//! (`/console/{id}`), and the key in the durable state document.

use serde::{Deserialize, Serialize};

/// Unique identifier for a supervised session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id of the `session-{epoch_ms}` shape the
    /// console route parser expects.
    pub fn generate(now_ms: u64) -> Self {
        Self(format!("session-{}", now_ms))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reverse-proxy base path for this session's terminal server.
    pub fn proxy_path(&self) -> String {
        format!("/console/{}", self.0)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for SessionId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SessionId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::borrow::Borrow<str> for SessionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
