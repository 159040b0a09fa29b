// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for captured output and validation.

#![cfg(unix)]

use super::{executor, run_async, sh};
use crate::ExecError;
use cmdr_core::{CommandSpec, Stream, Validation};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[tokio::test]
async fn three_lines_of_stdout() {
    let out = executor()
        .output(&CommandSpec::new("printf").arg("a\\nb\\nc\\n"))
        .await
        .unwrap();
    assert_eq!(out.lines(), ["a", "b", "c"]);
    assert_eq!(out.stdout(), "a\nb\nc");
    assert_eq!(out.stderr(), "");
    assert_eq!(out.exit_code(), 0);
    assert!(out.success());
}

#[tokio::test]
async fn streams_are_tagged_and_sequenced() {
    let out = executor()
        .output(&sh("echo one; echo two >&2; echo three"))
        .await
        .unwrap();
    assert_eq!(out.lines(), ["one", "three"]);
    assert_eq!(out.stderr_lines(), ["two"]);
    assert_eq!(out.combined_lines().len(), 3);
    let seqs: Vec<u64> = out.fragments().iter().map(|l| l.seq).collect();
    assert_eq!(seqs, [0, 1, 2]);
    assert!(out
        .fragments()
        .iter()
        .any(|l| l.stream == Stream::Stderr && l.text == "two"));
}

#[tokio::test]
async fn crlf_and_missing_final_newline() {
    let out = executor()
        .output(&CommandSpec::new("printf").arg("dos\\r\\nlast"))
        .await
        .unwrap();
    assert_eq!(out.lines(), ["dos", "last"]);
}

#[tokio::test]
async fn invalid_utf8_is_replaced() {
    let out = executor()
        .output(&CommandSpec::new("printf").arg("ok\\377\\n"))
        .await
        .unwrap();
    assert_eq!(out.stdout(), "ok\u{FFFD}");
}

#[tokio::test]
async fn no_output_gives_empty_views() {
    let out = executor().output(&CommandSpec::new("true")).await.unwrap();
    assert!(out.fragments().is_empty());
    assert_eq!(out.combined(), "");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[yare::parameterized(
    checked_zero = { "exit 0", Validation::ZeroExitCode, Ok(0) },
    checked_nonzero = { "echo boom >&2; exit 2", Validation::ZeroExitCode, Err(2) },
    unchecked_zero = { "exit 0", Validation::None, Ok(0) },
    unchecked_nonzero = { "echo boom >&2; exit 2", Validation::None, Ok(2) },
)]
fn validation_policy(script: &str, validation: Validation, expected: Result<i32, i32>) {
    run_async(async {
        let result = executor()
            .output(&sh(script).validation(validation))
            .await;
        match (result, expected) {
            (Ok(out), Ok(code)) => {
                assert_eq!(out.exit_code(), code);
                assert_eq!(out.success(), code == 0);
            }
            (Err(ExecError::NonZeroExit { exit_code, output, .. }), Err(code)) => {
                assert_eq!(exit_code, code);
                let output = output.expect("captured output on failure");
                assert_eq!(output.stderr(), "boom");
            }
            (other, expected) => panic!("expected {expected:?}, got {other:?}"),
        }
    });
}

#[tokio::test]
async fn failure_message_names_the_command() {
    let err = executor()
        .output(&CommandSpec::new("sh").args(["-c", "exit 9"]))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), Some(9));
    assert_eq!(
        err.to_string(),
        "command `sh -c 'exit 9'` failed with exit code 9"
    );
    assert!(err.output().is_some());
}

#[tokio::test]
async fn spawn_failure_is_never_swallowed() {
    for validation in [Validation::ZeroExitCode, Validation::None] {
        let err = executor()
            .output(&CommandSpec::new("definitely-not-a-real-program-4f1c").validation(validation))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::SpawnFailed { .. }), "{err:?}");
    }
}
