// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_has_no_args_and_validates() {
    let cmd = CommandSpec::new("git");
    assert_eq!(cmd.get_program(), "git");
    assert!(cmd.get_args().is_empty());
    assert!(cmd.get_cwd().is_none());
    assert_eq!(cmd.get_stdin(), &Stdin::Null);
    assert_eq!(cmd.get_validation(), Validation::ZeroExitCode);
}

#[test]
fn args_keep_order() {
    let cmd = CommandSpec::new("git")
        .arg("log")
        .args(["--oneline", "-n"])
        .arg("5");
    assert_eq!(cmd.get_args(), ["log", "--oneline", "-n", "5"]);
}

#[test]
fn env_last_write_wins() {
    let cmd = CommandSpec::new("env")
        .env("A", "1")
        .env("B", "2")
        .envs([("A", "3")]);
    assert_eq!(cmd.get_env().get("A").map(String::as_str), Some("3"));
    // First insertion position is kept
    let keys: Vec<_> = cmd.get_env().keys().map(String::as_str).collect();
    assert_eq!(keys, ["A", "B"]);
}

#[test]
fn stdin_text_sets_literal_source() {
    let cmd = CommandSpec::new("cat").stdin_text("hello");
    assert_eq!(cmd.get_stdin(), &Stdin::Text("hello".to_string()));

    let cmd = cmd.stdin(Stdin::Inherit);
    assert_eq!(cmd.get_stdin(), &Stdin::Inherit);
}

#[yare::parameterized(
    validated_zero     = { Validation::ZeroExitCode, 0, false },
    validated_nonzero  = { Validation::ZeroExitCode, 2, true },
    unchecked_zero     = { Validation::None,         0, false },
    unchecked_nonzero  = { Validation::None,         2, false },
)]
fn rejects_follows_policy(validation: Validation, exit_code: i32, expected: bool) {
    let cmd = CommandSpec::new("x").validation(validation);
    assert_eq!(cmd.rejects(exit_code), expected);
}

#[test]
fn unchecked_disables_validation() {
    assert_eq!(
        CommandSpec::new("x").unchecked().get_validation(),
        Validation::None
    );
}

#[test]
fn pipe_builds_two_stage_pipeline() {
    let pipeline = CommandSpec::new("echo").arg("hi").pipe(CommandSpec::new("cat"));
    assert_eq!(pipeline.len(), 2);
    assert_eq!(pipeline.stages()[0].get_program(), "echo");
    assert_eq!(pipeline.last().map(|c| c.get_program()), Some("cat"));
}

#[test]
fn cwd_is_stored() {
    let cmd = CommandSpec::new("pwd").cwd("/tmp");
    assert_eq!(cmd.get_cwd(), Some(std::path::Path::new("/tmp")));
}

#[test]
fn stdin_serializes_with_kind_tag() {
    let json = serde_json::to_value(Stdin::Text("abc".into())).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "text", "text": "abc"}));
    let json = serde_json::to_value(Stdin::Inherit).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "inherit"}));
}
