// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the command executor.

use super::*;

mod capture;
mod modes;
mod pipeline;
mod stop;
mod stream;

/// Executor with short grace windows and no environment timeout.
pub(crate) fn executor() -> Executor {
    Executor::new()
        .no_timeout()
        .kill_grace(Duration::from_millis(500))
        .drain_grace(Duration::from_millis(200))
}

pub(crate) fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").args(["-c", script])
}

/// Sync wrapper for async execution in parameterized tests.
pub(crate) fn run_async<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Runtime::new().unwrap().block_on(f)
}
