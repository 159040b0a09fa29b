//! Cancellation and timeouts against real children.

use std::time::Duration;

use crate::prelude::*;
use tokio_util::sync::CancellationToken;

/// A 10s sleep cancelled after 100ms returns promptly as a cancellation.
#[tokio::test]
async fn cancelled_sleep_returns_promptly() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = executor()
        .cancel_token(token)
        .run(&CommandSpec::new("sleep").arg("10"))
        .await
        .unwrap_err();
    let elapsed = start.elapsed();
    assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");
    match err {
        ExecError::Cancelled { reason, .. } => assert_eq!(reason, CancelReason::Cancelled),
        other => panic!("expected cancellation, got {other:?}"),
    }
}

/// Cancellation takes down whatever the child started, not just the child.
#[cfg(target_os = "linux")]
#[tokio::test]
async fn no_process_outlives_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let pids = dir.path().join("pids");
    let script = format!(
        "echo $$ > {0}; sleep 10 & echo $! >> {0}; wait",
        pids.to_string_lossy()
    );
    let err = executor()
        .timeout(Duration::from_millis(300))
        .output(&sh(&script))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    let recorded = std::fs::read_to_string(&pids).unwrap();
    let deadline = Instant::now() + Duration::from_secs(2);
    for pid in recorded.lines() {
        while running(pid) && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!running(pid), "process {pid} survived");
    }
}

#[cfg(target_os = "linux")]
fn running(pid: &str) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| stat.rsplit_once(") ").map(|(_, rest)| !rest.starts_with('Z')))
        .unwrap_or(false)
}

/// A line cut off by cancellation is kept as the final fragment.
#[tokio::test]
async fn partial_line_is_flushed_on_cancel() {
    let err = executor()
        .timeout(Duration::from_millis(300))
        .output(&sh("printf 'complete\\nincompl'; sleep 10"))
        .await
        .unwrap_err();
    let output = err.output().expect("captured output");
    assert_eq!(output.lines(), ["complete", "incompl"]);
    assert_eq!(output.fragments().last().unwrap().stream, Stream::Stdout);
}

/// Timeouts are reported as cancellations, never as exit-code failures.
#[tokio::test]
async fn timeout_is_not_an_exit_failure() {
    let err = executor()
        .timeout(Duration::from_millis(100))
        .run(&CommandSpec::new("sleep").arg("5").unchecked())
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(err.exit_code(), None);
}
