// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the non-capturing modes.

#![cfg(unix)]

use super::{executor, sh};
use crate::{ExecError, MockScope, MockSetup};
use cmdr_core::CommandSpec;

#[tokio::test]
async fn run_reports_status_only() {
    let result = executor().run(&sh("echo forwarded")).await.unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.pipe_status, [0]);
    assert!(result.success());
}

#[tokio::test]
async fn run_validates_exit_code() {
    let err = executor().run(&sh("exit 5")).await.unwrap_err();
    match err {
        ExecError::NonZeroExit { exit_code, output, .. } => {
            assert_eq!(exit_code, 5);
            assert!(output.is_none());
        }
        other => panic!("expected NonZeroExit, got {other:?}"),
    }
}

#[tokio::test]
async fn run_unchecked_returns_failure() {
    let result = executor().run(&sh("exit 5").unchecked()).await.unwrap();
    assert_eq!(result.exit_code, 5);
    assert!(!result.success());
}

#[tokio::test]
async fn passthrough_returns_exit_code() {
    let result = executor()
        .passthrough(&sh("echo straight through; exit 3").unchecked())
        .await
        .unwrap();
    assert_eq!(result.exit_code, 3);
}

#[tokio::test]
async fn interactive_inherits_and_reports() {
    let result = executor()
        .interactive(&CommandSpec::new("true"))
        .await
        .unwrap();
    assert_eq!(result.exit_code, 0);
}

#[tokio::test]
async fn run_under_mocks_spawns_nothing() {
    MockScope::enable(|mocks| async move {
        mocks.setup(MockSetup::new("rm").exit_code(1));
        let err = executor()
            .run(&CommandSpec::new("rm").args(["-rf", "/"]))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert!(mocks.was_called("rm", ["-rf", "/"]));
    })
    .await;
}
