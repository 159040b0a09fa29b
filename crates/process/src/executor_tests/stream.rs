// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for streamed output.

use std::time::{Duration, Instant};

use futures_util::StreamExt;

use super::{executor, sh};
use crate::{ExecError, MockScope, MockSetup, Selection};
use cmdr_core::{CommandSpec, Stream};

#[cfg(unix)]
#[tokio::test]
async fn lines_arrive_before_exit() {
    let mut stream = executor().stream(&sh("echo first; sleep 1; echo second"));
    let start = Instant::now();
    let first = stream.next_line().await.unwrap();
    assert_eq!(first.text, "first");
    assert!(start.elapsed() < Duration::from_millis(900));

    let second = stream.next_line().await.unwrap();
    assert_eq!(second.text, "second");
    assert!(stream.next_line().await.is_none());
    assert_eq!(stream.finish().await.unwrap().exit_code, 0);
}

#[cfg(unix)]
#[tokio::test]
async fn stream_trait_with_selection() {
    let stream = executor()
        .stream(&sh("echo out1; echo err1 >&2; echo out2"))
        .stderr_only();
    assert_eq!(stream.selection(), Selection::Stderr);
    let lines: Vec<_> = stream.collect().await;
    assert_eq!(lines.len(), 1);
    assert_eq!((lines[0].stream, lines[0].text.as_str()), (Stream::Stderr, "err1"));
}

#[cfg(unix)]
#[tokio::test]
async fn finish_applies_validation() {
    let mut stream = executor().stream(&sh("echo partial; exit 3")).stdout_only();
    assert_eq!(stream.next_line().await.unwrap().text, "partial");
    let err = stream.finish().await.unwrap_err();
    assert_eq!(err.exit_code(), Some(3));
}

#[cfg(unix)]
#[tokio::test]
async fn cancel_stops_the_child() {
    let mut stream = executor().stream(&sh("echo up; sleep 10"));
    assert_eq!(stream.next_line().await.unwrap().text, "up");
    let start = Instant::now();
    stream.cancel();
    let err = stream.finish().await.unwrap_err();
    assert!(err.is_cancelled(), "{err:?}");
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn dropping_the_stream_kills_the_child() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("pid");
    let script = format!("echo $$ > {}; echo up; sleep 30", pidfile.to_string_lossy());
    let mut stream = executor().stream(&sh(&script));
    stream.next_line().await.unwrap();
    let pid = std::fs::read_to_string(&pidfile).unwrap();
    drop(stream);

    let proc_dir = format!("/proc/{}", pid.trim());
    let deadline = Instant::now() + Duration::from_secs(3);
    while std::path::Path::new(&proc_dir).exists() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!std::path::Path::new(&proc_dir).exists());
}

#[tokio::test]
async fn stream_uses_mocks_of_the_calling_task() {
    MockScope::enable(|mocks| async move {
        mocks.setup(MockSetup::new("tail").stdout("l1\nl2"));
        let stream = executor().stream(&CommandSpec::new("tail").arg("-f"));
        let texts: Vec<String> = stream.map(|l| l.text).collect().await;
        assert_eq!(texts, ["l1", "l2"]);
        assert_eq!(mocks.calls().len(), 1);
    })
    .await;
}

#[tokio::test]
async fn stream_reports_missing_mock_on_finish() {
    let err = MockScope::enable(|_mocks| async {
        let mut stream = executor().stream(&CommandSpec::new("tail"));
        assert!(stream.next_line().await.is_none());
        stream.finish().await.unwrap_err()
    })
    .await;
    assert!(matches!(err, ExecError::NoMock { .. }), "{err:?}");
}
