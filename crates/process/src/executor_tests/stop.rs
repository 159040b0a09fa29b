// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for cancellation and timeouts through the executor.

#![cfg(unix)]

use std::time::{Duration, Instant};

use super::{executor, sh};
use crate::{CancelReason, ExecError};
use cmdr_core::CommandSpec;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn cancel_token_stops_long_sleep() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = executor()
        .cancel_token(token)
        .output(&CommandSpec::new("sleep").arg("10"))
        .await
        .unwrap_err();
    assert!(start.elapsed() < Duration::from_secs(3), "{:?}", start.elapsed());
    match err {
        ExecError::Cancelled { reason, output, .. } => {
            assert_eq!(reason, CancelReason::Cancelled);
            assert!(output.unwrap().fragments().is_empty());
        }
        other => panic!("expected Cancelled, got {other:?}"),
    }
}

#[tokio::test]
async fn timeout_is_distinct_from_failure() {
    let err = executor()
        .timeout(Duration::from_millis(200))
        .run(&CommandSpec::new("sleep").arg("10"))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(err.is_cancelled());
    assert_eq!(err.exit_code(), None);
    assert_eq!(err.to_string(), "command `sleep 10` timed out after 200ms");
}

#[tokio::test]
async fn pre_cancelled_token_prevents_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");
    let token = CancellationToken::new();
    token.cancel();

    let err = executor()
        .cancel_token(token)
        .run(&CommandSpec::new("touch").arg(marker.to_string_lossy().into_owned()))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(!marker.exists());
}

#[tokio::test]
async fn cancellation_keeps_partial_output() {
    let err = executor()
        .timeout(Duration::from_millis(300))
        .output(&sh("echo started; printf 'half'; sleep 10"))
        .await
        .unwrap_err();
    let output = err.output().expect("partial output");
    assert_eq!(output.lines(), ["started", "half"]);
}

#[tokio::test]
async fn term_ignoring_child_is_killed_after_grace() {
    let start = Instant::now();
    let err = executor()
        .kill_grace(Duration::from_millis(300))
        .timeout(Duration::from_millis(300))
        .output(&sh("trap '' TERM; echo ready; while :; do sleep 1; done"))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(start.elapsed() < Duration::from_secs(5), "{:?}", start.elapsed());
}

#[tokio::test]
async fn cancelling_pipeline_stops_every_stage() {
    let pipeline = CommandSpec::new("sleep")
        .arg("10")
        .pipe(CommandSpec::new("cat"));
    let start = Instant::now();
    let err = executor()
        .timeout(Duration::from_millis(200))
        .output_pipeline(&pipeline)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn parent_token_survives_invocation_timeout() {
    let token = CancellationToken::new();
    let err = executor()
        .cancel_token(token.clone())
        .timeout(Duration::from_millis(100))
        .run(&CommandSpec::new("sleep").arg("5"))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(!token.is_cancelled());
}
