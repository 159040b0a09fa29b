//! Defaults taken from the environment.

use std::time::Duration;

use crate::prelude::*;
use serial_test::serial;

struct EnvGuard(&'static str);

impl EnvGuard {
    fn set(key: &'static str, value: &str) -> Self {
        std::env::set_var(key, value);
        Self(key)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        std::env::remove_var(self.0);
    }
}

/// `CMDR_TIMEOUT_MS` applies to executors built after it is set.
#[test]
#[serial]
fn default_timeout_from_environment() {
    let _guard = EnvGuard::set("CMDR_TIMEOUT_MS", "150");
    let err = block_on(
        Executor::new()
            .kill_grace(Duration::from_millis(200))
            .run(&CommandSpec::new("sleep").arg("5")),
    )
    .unwrap_err();
    match err {
        ExecError::Cancelled { reason, .. } => {
            assert_eq!(reason, CancelReason::TimedOut(Duration::from_millis(150)))
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

/// An explicit `no_timeout` overrides the environment.
#[test]
#[serial]
fn no_timeout_overrides_environment() {
    let _guard = EnvGuard::set("CMDR_TIMEOUT_MS", "1");
    let result = block_on(
        Executor::new()
            .no_timeout()
            .run(&CommandSpec::new("sh").args(["-c", "sleep 0.2"])),
    )
    .unwrap();
    assert_eq!(result.exit_code, 0);
}

/// Unparseable values fall back to defaults.
#[test]
#[serial]
fn invalid_values_are_ignored() {
    let _guard = EnvGuard::set("CMDR_KILL_GRACE_MS", "soon");
    assert_eq!(cmdr_process::env::kill_grace(), Duration::from_secs(2));
}
