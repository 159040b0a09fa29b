//! Shared helpers for specs.

#![allow(dead_code, unused_imports)]

use std::sync::Once;
use std::time::Duration;

pub use cmdr_core::{CommandOutput, CommandSpec, Pipeline, Stream, Validation};
pub use cmdr_process::{CancelReason, ExecError, Executor, MockScope, MockSetup};
pub use std::time::Instant;

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`, once per binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Executor with short grace windows, independent of the environment.
pub fn executor() -> Executor {
    init_tracing();
    Executor::new()
        .no_timeout()
        .kill_grace(Duration::from_millis(500))
        .drain_grace(Duration::from_millis(200))
}

pub fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh").args(["-c", script])
}

/// Fluent checks over captured output.
pub trait OutputExt {
    fn stdout_is(&self, expected: &str) -> &Self;
    fn stderr_is(&self, expected: &str) -> &Self;
    fn exits_with(&self, code: i32) -> &Self;
}

impl OutputExt for CommandOutput {
    fn stdout_is(&self, expected: &str) -> &Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    fn stderr_is(&self, expected: &str) -> &Self {
        similar_asserts::assert_eq!(self.stderr(), expected);
        self
    }

    fn exits_with(&self, code: i32) -> &Self {
        assert_eq!(self.exit_code(), code, "stdout: {}", self.stdout());
        self
    }
}

/// Sync wrapper for async execution in parameterized specs.
pub fn block_on<F: std::future::Future>(f: F) -> F::Output {
    tokio::runtime::Runtime::new().unwrap().block_on(f)
}
