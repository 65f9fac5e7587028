// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Free-port discovery by bind probing.

use std::io;
use tokio::net::TcpListener;

/// Base of the terminal-server port range. High enough that collisions
/// with well-known services are unlikely.
pub const PORT_BASE: u16 = 40000;

/// Find a free TCP port at or after `candidate`.
///
/// Probes by binding on all interfaces (terminal servers listen the
/// same way, so a port that binds here binds for them). "Address in
/// use" advances to the next port; any other bind error propagates as
/// resource exhaustion.
pub async fn find_free_port(mut candidate: u16) -> io::Result<u16> {
    loop {
        match TcpListener::bind(("0.0.0.0", candidate)).await {
            Ok(listener) => {
                drop(listener);
                return Ok(candidate);
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                candidate = candidate.checked_add(1).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::AddrInUse, "port space exhausted")
                })?;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
