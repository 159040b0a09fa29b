// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task-scoped interception of command execution for tests.
//!
//! [`MockScope::enable`] creates mock state and runs a body with that state
//! active, so there is no point at which setups exist but invocations still
//! reach real programs. The state is carried by a tokio task-local, so it
//! follows the awaited call tree but does **not** cross `tokio::spawn`: to
//! intercept commands on a spawned task, pass [`MockScope::handle`] to
//! [`Executor::mocks`](crate::Executor::mocks) explicitly.
//!
//! While a scope is active every invocation is answered from its setups
//! and recorded; nothing is spawned. An invocation with no matching setup
//! fails with [`ExecError::NoMock`] rather than running the real program.
//!
//! ```no_run
//! use cmdr_core::CommandSpec;
//! use cmdr_process::{Executor, MockScope, MockSetup};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! MockScope::enable(|mocks| async move {
//!     mocks.setup(MockSetup::new("git").args(["rev-parse", "HEAD"]).stdout("abc123"));
//!
//!     let spec = CommandSpec::new("git").args(["rev-parse", "HEAD"]);
//!     let out = Executor::new().output(&spec).await?;
//!     assert_eq!(out.stdout(), "abc123");
//!     assert_eq!(mocks.call_count("git", ["rev-parse", "HEAD"]), 1);
//!     Ok::<_, Box<dyn std::error::Error>>(())
//! })
//! .await
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use cmdr_core::{CommandSpec, ExecutionResult, Pipeline, Stdin, Stream};
use parking_lot::Mutex;
use regex::Regex;

use crate::aggregate::Aggregator;
use crate::cancel::Cancellation;
use crate::error::ExecError;
use crate::run::Outcome;

tokio::task_local! {
    static ACTIVE: MockHandle;
}

/// Match over a command's argument vector.
#[derive(Debug, Clone)]
pub enum ArgPattern {
    /// Any arguments, including none.
    Any,
    /// Exactly these arguments in this order.
    Exact(Vec<String>),
    /// Arguments starting with these, in this order.
    Prefix(Vec<String>),
    /// Regex searched in the arguments joined by single spaces.
    Regex(Regex),
}

impl ArgPattern {
    pub fn exact(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ArgPattern::Exact(args.into_iter().map(Into::into).collect())
    }

    pub fn prefix(args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ArgPattern::Prefix(args.into_iter().map(Into::into).collect())
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(ArgPattern::Regex(Regex::new(pattern)?))
    }

    pub fn matches(&self, args: &[String]) -> bool {
        match self {
            ArgPattern::Any => true,
            ArgPattern::Exact(expected) => expected.as_slice() == args,
            ArgPattern::Prefix(prefix) => args.starts_with(prefix),
            ArgPattern::Regex(re) => re.is_match(&args.join(" ")),
        }
    }
}

impl fmt::Display for ArgPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgPattern::Any => f.write_str("*"),
            ArgPattern::Exact(args) => write!(f, "{}", args.join(" ")),
            ArgPattern::Prefix(args) => write!(f, "{} *", args.join(" ")),
            ArgPattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl<const N: usize> From<[&str; N]> for ArgPattern {
    fn from(args: [&str; N]) -> Self {
        ArgPattern::exact(args)
    }
}

impl From<&[&str]> for ArgPattern {
    fn from(args: &[&str]) -> Self {
        ArgPattern::exact(args.iter().copied())
    }
}

impl From<Vec<String>> for ArgPattern {
    fn from(args: Vec<String>) -> Self {
        ArgPattern::Exact(args)
    }
}

/// A canned response for invocations matching a program and argument pattern.
#[derive(Debug, Clone)]
pub struct MockSetup {
    program: String,
    args: ArgPattern,
    stdout: String,
    stderr: String,
    exit_code: i32,
    delay: Option<Duration>,
    fault: Option<String>,
}

impl MockSetup {
    /// Match `program` with any arguments; respond with empty output and exit 0.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: ArgPattern::Any,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            delay: None,
            fault: None,
        }
    }

    pub fn args(mut self, pattern: impl Into<ArgPattern>) -> Self {
        self.args = pattern.into();
        self
    }

    pub fn stdout(mut self, text: impl Into<String>) -> Self {
        self.stdout = text.into();
        self
    }

    pub fn stderr(mut self, text: impl Into<String>) -> Self {
        self.stderr = text.into();
        self
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Respond only after `delay`; cancellation and timeouts still apply.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Raise [`ExecError::MockFault`] instead of producing a result.
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.fault = Some(message.into());
        self
    }

    fn matches(&self, spec: &CommandSpec) -> bool {
        self.program == spec.get_program() && self.args.matches(spec.get_args())
    }
}

/// One intercepted invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Literal stdin text, if the command supplied any.
    pub stdin: Option<String>,
}

impl MockCall {
    fn record(spec: &CommandSpec) -> Self {
        Self {
            program: spec.get_program().to_string(),
            args: spec.get_args().to_vec(),
            cwd: spec.get_cwd().map(PathBuf::from),
            env: spec
                .get_env()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            stdin: match spec.get_stdin() {
                Stdin::Text(text) => Some(text.clone()),
                _ => None,
            },
        }
    }
}

impl fmt::Display for MockCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", cmdr_core::quote(arg))?;
        }
        Ok(())
    }
}

/// Mock verification failures.
#[derive(Debug, thiserror::Error)]
pub enum MockError {
    #[error("expected a call to `{expected}`; recorded calls: [{}]", .calls.join(", "))]
    NotCalled {
        expected: String,
        calls: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    setups: Vec<MockSetup>,
    calls: Vec<MockCall>,
}

/// Shared handle to one scope's mock state.
#[derive(Debug, Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// The handle installed for the current task, if any.
    pub(crate) fn current() -> Option<MockHandle> {
        ACTIVE.try_with(MockHandle::clone).ok()
    }

    /// Record every stage and answer from the setups.
    ///
    /// Stage responses are looked up first to last; output comes from the
    /// last stage, exit codes from every stage.
    pub(crate) async fn intercept(
        &self,
        pipeline: &Pipeline,
        sink: &Aggregator,
        cancel: &Cancellation,
    ) -> Result<Outcome, ExecError> {
        if pipeline.is_empty() {
            return Err(ExecError::EmptyPipeline);
        }
        if let Some(reason) = cancel.fired() {
            return Err(ExecError::Cancelled {
                command: pipeline.to_string(),
                reason,
                output: None,
            });
        }
        let started_at = SystemTime::now();

        let mut responses = Vec::with_capacity(pipeline.len());
        for stage in pipeline.stages() {
            let setup = {
                let mut state = self.state.lock();
                state.calls.push(MockCall::record(stage));
                // Later setups override earlier ones
                state.setups.iter().rev().find(|s| s.matches(stage)).cloned()
            };
            let Some(setup) = setup else {
                tracing::debug!(cmd = %stage, "no mock configured");
                return Err(ExecError::NoMock {
                    command: stage.to_string(),
                });
            };
            tracing::debug!(cmd = %stage, pattern = %setup.args, "mocked");
            responses.push(setup);
        }

        // Stages run concurrently, so the slowest one sets the pace
        if let Some(delay) = responses.iter().filter_map(|r| r.delay).max() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                reason = cancel.triggered() => {
                    let pipe_status = vec![-1; responses.len()];
                    return Ok(Outcome::Cancelled {
                        reason,
                        result: ExecutionResult {
                            exit_code: pipeline.exit_code(&pipe_status),
                            pipe_status,
                            started_at,
                            finished_at: SystemTime::now(),
                        },
                    });
                }
            }
        }

        for (stage, setup) in pipeline.stages().iter().zip(&responses) {
            if let Some(message) = &setup.fault {
                return Err(ExecError::MockFault {
                    command: stage.to_string(),
                    message: message.clone(),
                });
            }
        }

        if let Some(last) = responses.last() {
            for line in last.stdout.lines() {
                sink.push(Stream::Stdout, line.to_string());
            }
            for line in last.stderr.lines() {
                sink.push(Stream::Stderr, line.to_string());
            }
        }

        let pipe_status: Vec<i32> = responses.iter().map(|r| r.exit_code).collect();
        Ok(Outcome::Exited(ExecutionResult {
            exit_code: pipeline.exit_code(&pipe_status),
            pipe_status,
            started_at,
            finished_at: SystemTime::now(),
        }))
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        state.setups.clear();
        state.calls.clear();
    }
}

/// Mock state for one logical call tree.
///
/// Dropping the scope clears its setups and call log, including when the
/// code run inside it panicked. A handle that outlives its scope therefore
/// answers every invocation with [`ExecError::NoMock`].
#[derive(Debug)]
pub struct MockScope {
    handle: MockHandle,
}

impl MockScope {
    /// Run `body` with fresh mock state active for everything it awaits.
    ///
    /// The scope is handed to `body` by value and cleared when `body`
    /// finishes or unwinds.
    pub async fn enable<F, Fut>(body: F) -> Fut::Output
    where
        F: FnOnce(MockScope) -> Fut,
        Fut: Future,
    {
        let scope = Self::new();
        let handle = scope.handle.clone();
        // Code in `body` that runs before its first await is covered too
        let fut = ACTIVE.sync_scope(handle.clone(), || body(scope));
        ACTIVE.scope(handle, fut).await
    }

    /// Synchronous form of [`enable`](Self::enable), for code that builds
    /// futures or streams without awaiting them.
    pub fn enable_sync<R>(body: impl FnOnce(MockScope) -> R) -> R {
        let scope = Self::new();
        let handle = scope.handle.clone();
        ACTIVE.sync_scope(handle, || body(scope))
    }

    fn new() -> Self {
        Self {
            handle: MockHandle::default(),
        }
    }

    /// Register a response. Later registrations take precedence.
    pub fn setup(&self, setup: MockSetup) -> &Self {
        self.handle.state.lock().setups.push(setup);
        self
    }

    /// Handle for carrying this scope's state across `tokio::spawn`.
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    /// Every intercepted invocation, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.handle.state.lock().calls.clone()
    }

    /// Number of recorded calls to `program` whose arguments match `args`.
    pub fn call_count(&self, program: &str, args: impl Into<ArgPattern>) -> usize {
        let pattern = args.into();
        self.handle
            .state
            .lock()
            .calls
            .iter()
            .filter(|c| c.program == program && pattern.matches(&c.args))
            .count()
    }

    pub fn was_called(&self, program: &str, args: impl Into<ArgPattern>) -> bool {
        self.call_count(program, args) > 0
    }

    /// Check that `program` was called with matching arguments at least once.
    pub fn verify_called(
        &self,
        program: &str,
        args: impl Into<ArgPattern>,
    ) -> Result<(), MockError> {
        let pattern = args.into();
        if self.call_count(program, pattern.clone()) > 0 {
            return Ok(());
        }
        Err(MockError::NotCalled {
            expected: format!("{program} {pattern}"),
            calls: self.calls().iter().map(ToString::to_string).collect(),
        })
    }
}

impl Drop for MockScope {
    fn drop(&mut self) {
        self.handle.clear();
    }
}

#[cfg(test)]
#[path = "mock_tests.rs"]
mod tests;
