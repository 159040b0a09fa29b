//! Pipelines of real programs.

use crate::prelude::*;

fn direct_count(lines: &[&str], needle: &str) -> usize {
    lines.iter().filter(|l| l.contains(needle)).count()
}

/// printf | grep | wc -l agrees with counting in-process.
#[yare::parameterized(
    none_match = { &["alpha", "beta"], "zeta" },
    one_match = { &["alpha", "beta", "gamma"], "mm" },
    all_match = { &["ab", "abc", "cab"], "ab" },
    empty_input = { &[], "x" },
    many = { &["x1", "y2", "x3", "x4", "y5", "x6", "x7"], "x" },
)]
fn three_stage_count_matches_direct_count(lines: &[&str], needle: &str) {
    block_on(async {
        let input: String = lines.iter().map(|l| format!("{l}\n")).collect();
        // grep exits 1 on no match; the count stage decides the outcome
        let pipeline = CommandSpec::new("printf")
            .args(["%s", input.as_str()])
            .pipe(CommandSpec::new("grep").arg(needle))
            .pipe(CommandSpec::new("wc").arg("-l"));
        let out = executor().output_pipeline(&pipeline).await.unwrap();
        let counted: usize = out.stdout().trim().parse().unwrap();
        assert_eq!(counted, direct_count(lines, needle));
        assert_eq!(out.pipe_status().len(), 3);
    });
}

/// Upstream failure, downstream success: the last stage's code wins.
#[tokio::test]
async fn upstream_failure_is_visible_but_not_fatal() {
    let pipeline = sh("echo payload; exit 2").pipe(CommandSpec::new("cat"));
    let out = executor().output_pipeline(&pipeline).await.unwrap();
    out.stdout_is("payload").exits_with(0);
    assert_eq!(out.pipe_status(), [2, 0]);
}

/// With pipefail the same pipeline fails with the upstream code.
#[tokio::test]
async fn pipefail_surfaces_upstream_failure() {
    let pipeline = sh("echo payload; exit 2")
        .pipe(CommandSpec::new("cat"))
        .pipefail(true);
    let err = executor().output_pipeline(&pipeline).await.unwrap_err();
    assert_eq!(err.exit_code(), Some(2));
    err.output().unwrap().stdout_is("payload");
}

/// Upstream success, downstream failure: the pipeline fails.
#[tokio::test]
async fn downstream_failure_fails_the_pipeline() {
    let pipeline = CommandSpec::new("printf")
        .arg("data\\n")
        .pipe(sh("cat > /dev/null; echo rejected >&2; exit 5"));
    let err = executor().output_pipeline(&pipeline).await.unwrap_err();
    assert_eq!(err.exit_code(), Some(5));
    err.output().unwrap().stderr_is("rejected");
}

/// Only the final stage's output is captured.
#[tokio::test]
async fn intermediate_output_is_not_captured() {
    let pipeline = sh("echo upstream-noise >&2; echo keep; echo drop")
        .pipe(CommandSpec::new("grep").arg("keep"));
    let out = executor().output_pipeline(&pipeline).await.unwrap();
    assert_eq!(out.combined_lines(), ["keep"]);
}

/// Stages run concurrently: a slow producer streams through to the consumer.
#[tokio::test]
async fn stages_run_concurrently() {
    let pipeline = sh("echo first; sleep 1; echo second").pipe(CommandSpec::new("cat"));
    let mut stream = executor().stream_pipeline(&pipeline);
    let start = Instant::now();
    assert_eq!(stream.next_line().await.unwrap().text, "first");
    assert!(start.elapsed() < std::time::Duration::from_millis(900));
    assert_eq!(stream.next_line().await.unwrap().text, "second");
    stream.finish().await.unwrap();
}
