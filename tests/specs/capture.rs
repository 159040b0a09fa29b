//! Capturing output and applying the validation policy.

use crate::prelude::*;

/// Three printed lines come back as three stdout lines and no stderr.
#[tokio::test]
async fn three_lines_are_captured_in_order() {
    let out = executor()
        .output(&CommandSpec::new("printf").arg("a\\nb\\nc\\n"))
        .await
        .unwrap();
    out.stdout_is("a\nb\nc").stderr_is("").exits_with(0);
    assert_eq!(out.lines(), ["a", "b", "c"]);
    assert!(out.success());
}

/// Views are computed once and return identical text on every access.
#[tokio::test]
async fn views_are_stable() {
    let out = executor()
        .output(&sh("for i in 1 2 3; do echo o$i; echo e$i >&2; done"))
        .await
        .unwrap();
    let first = out.combined().to_string();
    assert_eq!(out.combined(), first);
    assert!(std::ptr::eq(out.combined(), out.combined()));
    assert_eq!(out.lines(), ["o1", "o2", "o3"]);
    assert_eq!(out.stderr_lines(), ["e1", "e2", "e3"]);
}

/// Writing far more than a pipe buffer to both streams completes.
#[tokio::test]
async fn heavy_output_on_both_streams_completes() {
    let script = concat!(
        "head -c 300000 /dev/zero | tr '\\0' 'o'; echo; ",
        "head -c 300000 /dev/zero | tr '\\0' 'e' >&2; echo >&2",
    );
    let out = tokio::time::timeout(
        std::time::Duration::from_secs(30),
        executor().output(&sh(script)),
    )
    .await
    .expect("deadlocked")
    .unwrap();
    assert_eq!(out.stdout().len(), 300000);
    assert_eq!(out.stderr().len(), 300000);
}

/// Nonzero exit raises with the output attached unless validation is off.
#[tokio::test]
async fn validation_on_and_off() {
    let failing = sh("echo diagnostic >&2; exit 3");

    let err = executor().output(&failing).await.unwrap_err();
    assert_eq!(err.exit_code(), Some(3));
    err.output().unwrap().stderr_is("diagnostic");

    let out = executor()
        .output(&failing.validation(Validation::None))
        .await
        .unwrap();
    out.exits_with(3).stderr_is("diagnostic");
    assert!(!out.success());
}

/// A missing executable is an error whatever the validation policy.
#[tokio::test]
async fn missing_program_fails_to_spawn() {
    let err = executor()
        .output(&CommandSpec::new("no-such-program-in-path").unchecked())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::SpawnFailed { .. }), "{err:?}");
    assert!(err.to_string().starts_with("failed to spawn `no-such-program-in-path`"));
}

/// Arguments reach the program verbatim, without shell interpretation.
#[tokio::test]
async fn arguments_are_not_shell_interpreted() {
    let out = executor()
        .output(&CommandSpec::new("printf").args(["%s|%s\\n", "$HOME", "a b;c"]))
        .await
        .unwrap();
    out.stdout_is("$HOME|a b;c");
}
