// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for executor defaults.

use std::time::Duration;

fn millis(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Grace window between SIGTERM and SIGKILL (default 2s, `CMDR_KILL_GRACE_MS`).
pub fn kill_grace() -> Duration {
    millis("CMDR_KILL_GRACE_MS").unwrap_or(Duration::from_secs(2))
}

/// How long output draining continues after a cancelled child is terminated
/// (default 500ms, `CMDR_DRAIN_GRACE_MS`).
pub fn drain_grace() -> Duration {
    millis("CMDR_DRAIN_GRACE_MS").unwrap_or(Duration::from_millis(500))
}

/// Timeout applied to every invocation unless overridden (`CMDR_TIMEOUT_MS`).
pub fn default_timeout() -> Option<Duration> {
    millis("CMDR_TIMEOUT_MS")
}

/// Bytes of intermediate pipeline-stage stderr kept for diagnostics
/// (default 8192, `CMDR_SNIPPET_LIMIT`).
pub fn snippet_limit() -> usize {
    std::env::var("CMDR_SNIPPET_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(8192)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
