// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for pipelines and their failure policy.

#![cfg(unix)]

use super::{executor, sh};
use crate::ExecError;
use cmdr_core::{CommandSpec, Pipeline};

#[tokio::test]
async fn three_stage_count() {
    let pipeline = CommandSpec::new("printf")
        .arg("alpha\\nbeta\\ngamma\\nalphabet\\n")
        .pipe(CommandSpec::new("grep").arg("alpha"))
        .pipe(CommandSpec::new("wc").arg("-l"));
    let out = executor().output_pipeline(&pipeline).await.unwrap();
    assert_eq!(out.stdout().trim(), "2");
    assert_eq!(out.pipe_status(), [0, 0, 0]);
}

#[tokio::test]
async fn stdin_text_feeds_the_first_stage() {
    let pipeline = CommandSpec::new("cat")
        .stdin_text("b\na\nc\n")
        .pipe(CommandSpec::new("sort"));
    let out = executor().output_pipeline(&pipeline).await.unwrap();
    assert_eq!(out.lines(), ["a", "b", "c"]);
}

#[tokio::test]
async fn upstream_fails_downstream_succeeds() {
    let pipeline = sh("echo data; exit 4").pipe(CommandSpec::new("cat"));
    let out = executor().output_pipeline(&pipeline).await.unwrap();
    assert_eq!(out.exit_code(), 0);
    assert_eq!(out.pipe_status(), [4, 0]);
    assert_eq!(out.stdout(), "data");
}

#[tokio::test]
async fn upstream_fails_under_pipefail() {
    let pipeline = sh("echo data; exit 4")
        .pipe(CommandSpec::new("cat"))
        .pipefail(true);
    let err = executor().output_pipeline(&pipeline).await.unwrap_err();
    match err {
        ExecError::NonZeroExit { command, exit_code, output } => {
            assert_eq!(exit_code, 4);
            assert_eq!(command, "sh -c 'echo data; exit 4'");
            assert_eq!(output.unwrap().pipe_status(), [4, 0]);
        }
        other => panic!("expected NonZeroExit, got {other:?}"),
    }
}

#[tokio::test]
async fn upstream_succeeds_downstream_fails() {
    let pipeline = CommandSpec::new("printf")
        .arg("x\\n")
        .pipe(sh("cat >/dev/null; exit 6"));
    let err = executor().output_pipeline(&pipeline).await.unwrap_err();
    assert_eq!(err.exit_code(), Some(6));
    assert_eq!(err.output().unwrap().pipe_status(), [0, 6]);
}

#[tokio::test]
async fn last_stage_validation_decides() {
    let pipeline = CommandSpec::new("printf")
        .arg("x\\n")
        .pipe(sh("cat >/dev/null; exit 6").unchecked());
    let out = executor().output_pipeline(&pipeline).await.unwrap();
    assert_eq!(out.exit_code(), 6);
    assert!(!out.success());
}

#[tokio::test]
async fn single_stage_pipeline_matches_direct_run() {
    let spec = CommandSpec::new("printf").arg("same\\n");
    let direct = executor().output(&spec).await.unwrap();
    let piped = executor().output_pipeline(&Pipeline::new(spec)).await.unwrap();
    assert_eq!(direct.stdout(), piped.stdout());
}

#[tokio::test]
async fn empty_pipeline_is_an_error() {
    let err = executor()
        .run_pipeline(&Pipeline::from_stages([]))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::EmptyPipeline));
}
