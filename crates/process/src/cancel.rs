// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation and timeout for running children.
//!
//! A timeout is a cancellation that fires itself after a duration: both
//! resolve through the same token, and the coordinator only remembers
//! which one fired first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::process::Child;
use tokio_util::sync::CancellationToken;

use crate::error::CancelReason;

/// Per-invocation cancellation state.
#[derive(Debug)]
pub(crate) struct Cancellation {
    token: CancellationToken,
    timeout: Option<Duration>,
    deadline: Option<tokio::time::Instant>,
    timed_out: AtomicBool,
}

impl Cancellation {
    /// Observe `parent` (if any) and fire on our own after `timeout`.
    ///
    /// Cancelling this invocation never cancels `parent`.
    pub(crate) fn new(parent: Option<&CancellationToken>, timeout: Option<Duration>) -> Self {
        Self {
            token: parent.map(CancellationToken::child_token).unwrap_or_default(),
            timeout,
            deadline: timeout.map(|t| tokio::time::Instant::now() + t),
            timed_out: AtomicBool::new(false),
        }
    }

    /// Token that cancels this invocation when fired.
    #[cfg(test)]
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Non-blocking check, used before anything is spawned.
    pub(crate) fn fired(&self) -> Option<CancelReason> {
        if let Some(deadline) = self.deadline {
            if tokio::time::Instant::now() >= deadline && !self.token.is_cancelled() {
                self.expire();
            }
        }
        self.token.is_cancelled().then(|| self.reason())
    }

    /// Resolves once cancellation or the timeout fires.
    pub(crate) async fn triggered(&self) -> CancelReason {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => self.expire(),
                }
            }
            None => self.token.cancelled().await,
        }
        self.reason()
    }

    fn expire(&self) {
        self.timed_out.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    fn reason(&self) -> CancelReason {
        match self.timeout {
            Some(after) if self.timed_out.load(Ordering::SeqCst) => CancelReason::TimedOut(after),
            _ => CancelReason::Cancelled,
        }
    }
}

/// Stop `children`: SIGTERM first, SIGKILL after `grace`.
///
/// With `group` set, signals go to that process group so descendants the
/// children spawned are stopped too; leftovers in the group are killed even
/// when the children themselves exit within the grace window. Returns once
/// every child has been reaped.
pub(crate) async fn terminate(children: &mut [Child], group: Option<u32>, grace: Duration) {
    #[cfg(unix)]
    {
        signal(children, group, nix::sys::signal::Signal::SIGTERM);
        let all_exited = tokio::time::timeout(grace, async {
            for child in children.iter_mut() {
                let _ = child.wait().await;
            }
        })
        .await
        .is_ok();
        if !all_exited {
            tracing::warn!(
                grace_ms = grace.as_millis() as u64,
                "children still running after grace window, killing"
            );
        }
        if group.is_some() || !all_exited {
            signal(children, group, nix::sys::signal::Signal::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = (group, grace);

    for child in children.iter_mut() {
        if let Err(e) = child.kill().await {
            tracing::debug!(error = %e, "kill after termination failed");
        }
    }
}

#[cfg(unix)]
fn signal(children: &[Child], group: Option<u32>, sig: nix::sys::signal::Signal) {
    use nix::sys::signal::{kill, killpg};
    use nix::unistd::Pid;

    match group {
        Some(pgid) => {
            if let Err(e) = killpg(Pid::from_raw(pgid as i32), sig) {
                tracing::debug!(pgid, signal = %sig, error = %e, "killpg failed");
            }
        }
        None => {
            // Reaped children have no id
            for pid in children.iter().filter_map(Child::id) {
                if let Err(e) = kill(Pid::from_raw(pid as i32), sig) {
                    tracing::debug!(pid, signal = %sig, error = %e, "kill failed");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
