//! Task-scoped mocks: interception, isolation and teardown.

use crate::prelude::*;
use cmdr_process::ArgPattern;

/// Setting up a mock and invoking the program in the same scope never
/// reaches the real program.
#[tokio::test]
async fn setup_inside_enabled_scope_is_intercepted() {
    MockScope::enable(|mocks| async move {
        mocks.setup(MockSetup::new("echo").stdout("canned"));
        let out = executor()
            .output(&CommandSpec::new("echo").arg("real"))
            .await
            .unwrap();
        out.stdout_is("canned");
        assert_eq!(mocks.calls().len(), 1);
    })
    .await;
}

/// A program with no setup inside an enabled scope fails rather than running.
#[tokio::test]
async fn unconfigured_program_inside_scope_is_not_run() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("touched");
    let err = MockScope::enable(|_mocks| async {
        executor()
            .run(&CommandSpec::new("touch").arg(marker.to_string_lossy().into_owned()))
            .await
            .unwrap_err()
    })
    .await;
    assert!(matches!(err, ExecError::NoMock { .. }), "{err:?}");
    assert!(!marker.exists());
}

/// Two concurrent tests with different mocks for the same program never see
/// each other's setups or calls.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scopes_are_isolated() {
    async fn tenant(name: &'static str, rounds: usize) -> Vec<String> {
        MockScope::enable(|mocks| async move {
            mocks.setup(MockSetup::new("git").args(["config", "user.name"]).stdout(name));
            let mut seen = Vec::new();
            for _ in 0..rounds {
                let spec = CommandSpec::new("git").args(["config", "user.name"]);
                let out = executor().output(&spec).await.unwrap();
                seen.push(out.stdout().to_string());
                tokio::task::yield_now().await;
            }
            assert_eq!(mocks.calls().len(), rounds);
            seen
        })
        .await
    }

    let a = tokio::spawn(tenant("alice", 50));
    let b = tokio::spawn(tenant("bob", 50));
    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert!(a.iter().all(|s| s == "alice"));
    assert!(b.iter().all(|s| s == "bob"));
}

/// Mocked invocations spawn nothing and can be verified afterwards.
#[tokio::test]
async fn mocked_call_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("touched");
    let spec = CommandSpec::new("touch").arg(marker.to_string_lossy().into_owned());

    MockScope::enable(|mocks| async move {
        mocks.setup(MockSetup::new("touch"));
        executor().run(&spec).await.unwrap();

        mocks
            .verify_called("touch", ArgPattern::Any)
            .unwrap();
        assert!(mocks.verify_called("rm", ArgPattern::Any).is_err());
    })
    .await;
    assert!(!marker.exists());
}

/// An invocation without a matching setup fails instead of running for real.
#[tokio::test]
async fn unmatched_call_fails_loudly() {
    let err = MockScope::enable(|mocks| async move {
        mocks.setup(MockSetup::new("git").args(ArgPattern::prefix(["status"])));
        executor()
            .output(&CommandSpec::new("git").arg("push"))
            .await
            .unwrap_err()
    })
    .await;
    assert_eq!(err.to_string(), "no mock configured for `git push`");
}

/// Mock output is subject to the same validation as real output.
#[tokio::test]
async fn mock_exit_code_is_validated() {
    MockScope::enable(|mocks| async move {
        mocks.setup(MockSetup::new("make").stderr("no rule").exit_code(2));

        let err = executor()
            .output(&CommandSpec::new("make").arg("all"))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(2));
        err.output().unwrap().stderr_is("no rule");

        let out = executor()
            .output(&CommandSpec::new("make").arg("all").unchecked())
            .await
            .unwrap();
        out.exits_with(2);
    })
    .await;
}

/// Configured faults surface as errors from the invocation.
#[tokio::test]
async fn mock_fault_is_raised() {
    let err = MockScope::enable(|mocks| async move {
        mocks.setup(MockSetup::new("kubectl").fail("cluster unreachable"));
        executor()
            .run(&CommandSpec::new("kubectl").arg("apply"))
            .await
            .unwrap_err()
    })
    .await;
    assert!(matches!(err, ExecError::MockFault { .. }), "{err:?}");
}

/// Leaving the scope tears mock state down, even after a failure inside it.
#[tokio::test]
async fn scope_teardown_after_failure() {
    let (handle, result) = MockScope::enable(|mocks| async move {
        mocks.setup(MockSetup::new("git"));
        let result = executor().output(&CommandSpec::new("npm")).await;
        (mocks.handle(), result)
    })
    .await;
    assert!(result.is_err());

    // The leftover handle no longer answers anything
    let err = executor()
        .mocks(handle)
        .output(&CommandSpec::new("git"))
        .await
        .unwrap_err();
    assert!(matches!(err, ExecError::NoMock { .. }), "{err:?}");
}

/// Pipelines are mocked stage by stage.
#[tokio::test]
async fn pipeline_under_mocks() {
    MockScope::enable(|mocks| async move {
        mocks
            .setup(MockSetup::new("cat").stdout("ignored"))
            .setup(MockSetup::new("wc").stdout("       3"));
        let pipeline = CommandSpec::new("cat")
            .arg("file.txt")
            .pipe(CommandSpec::new("wc").arg("-l"));
        let out = executor().output_pipeline(&pipeline).await.unwrap();
        assert_eq!(out.stdout().trim(), "3");
        assert_eq!(mocks.calls().len(), 2);
    })
    .await;
}
