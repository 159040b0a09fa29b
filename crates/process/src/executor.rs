// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async executor for [`CommandSpec`]s and [`Pipeline`]s.
//!
//! Each call spawns the program directly with its argument vector (no
//! shell), drains stdout and stderr concurrently, and waits for exit.
//! Pick the mode per call:
//!
//! - [`run`](Executor::run): forward output live, return the exit status
//! - [`output`](Executor::output): capture output into a [`CommandOutput`]
//! - [`stream`](Executor::stream): consume lines incrementally
//! - [`passthrough`](Executor::passthrough): child writes to our stdout/stderr
//! - [`interactive`](Executor::interactive): child owns the terminal
//!
//! # Example
//!
//! ```no_run
//! use cmdr_core::CommandSpec;
//! use cmdr_process::Executor;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let out = Executor::new()
//!     .timeout(Duration::from_secs(30))
//!     .output(&CommandSpec::new("git").args(["log", "--oneline", "-n", "3"]))
//!     .await?;
//!
//! assert_eq!(out.lines().len(), 3);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use cmdr_core::{CommandOutput, CommandSpec, ExecutionResult, Pipeline};
use tokio_util::sync::CancellationToken;

use crate::aggregate::{Aggregator, Route};
use crate::cancel::Cancellation;
use crate::env;
use crate::error::ExecError;
use crate::mock::MockHandle;
use crate::run::{self, Mode, Outcome, RunContext};
use crate::stream::OutputStream;

/// Runs commands and pipelines.
///
/// Create one with [`Executor::new`], configure it with builder methods,
/// then call one of the mode methods. An executor holds no per-invocation
/// state and can be shared.
#[derive(Debug, Clone)]
pub struct Executor {
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
    kill_grace: Duration,
    drain_grace: Duration,
    /// Max bytes of intermediate-stage stderr kept for diagnostics.
    snippet_limit: usize,
    mocks: Option<MockHandle>,
}

impl Executor {
    /// Create an executor with defaults from the environment.
    pub fn new() -> Self {
        Self {
            cancel: None,
            timeout: env::default_timeout(),
            kill_grace: env::kill_grace(),
            drain_grace: env::drain_grace(),
            snippet_limit: env::snippet_limit(),
            mocks: None,
        }
    }

    /// Stop invocations when `token` is cancelled.
    ///
    /// A token already cancelled prevents the spawn entirely.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Cancel each invocation after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Remove any timeout, including one from `CMDR_TIMEOUT_MS`.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Time allowed between the graceful stop request and a forced kill.
    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Time allowed for output draining after a cancelled child is stopped.
    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    pub fn snippet_limit(mut self, bytes: usize) -> Self {
        self.snippet_limit = bytes;
        self
    }

    /// Intercept invocations with explicit mock state instead of the
    /// task-local scope.
    pub fn mocks(mut self, handle: MockHandle) -> Self {
        self.mocks = Some(handle);
        self
    }

    /// Run with output forwarded live to this process's stdout/stderr.
    pub async fn run(&self, spec: &CommandSpec) -> Result<ExecutionResult, ExecError> {
        self.run_pipeline(&Pipeline::new(spec.clone())).await
    }

    /// Run and capture stdout and stderr.
    pub async fn output(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        self.output_pipeline(&Pipeline::new(spec.clone())).await
    }

    /// Run with the child writing directly to this process's stdout/stderr.
    pub async fn passthrough(&self, spec: &CommandSpec) -> Result<ExecutionResult, ExecError> {
        self.passthrough_pipeline(&Pipeline::new(spec.clone())).await
    }

    /// Run with the child inheriting stdin, stdout and stderr and staying in
    /// this process's group, so it can use the terminal.
    pub async fn interactive(&self, spec: &CommandSpec) -> Result<ExecutionResult, ExecError> {
        let pipeline = Pipeline::new(spec.clone());
        self.settle_status(&pipeline, Mode::Interactive).await
    }

    /// Start the command and return its output as a line stream.
    pub fn stream(&self, spec: &CommandSpec) -> OutputStream {
        self.stream_pipeline(&Pipeline::new(spec.clone()))
    }

    pub async fn run_pipeline(&self, pipeline: &Pipeline) -> Result<ExecutionResult, ExecError> {
        self.settle_status(pipeline, Mode::Forward).await
    }

    pub async fn passthrough_pipeline(
        &self,
        pipeline: &Pipeline,
    ) -> Result<ExecutionResult, ExecError> {
        self.settle_status(pipeline, Mode::Passthrough).await
    }

    /// Run a pipeline, capturing the last stage's stdout and stderr.
    pub async fn output_pipeline(&self, pipeline: &Pipeline) -> Result<CommandOutput, ExecError> {
        let sink = Aggregator::new(Route::Capture);
        let ctx = self.context(None);
        let outcome = self.dispatch(pipeline, Mode::Capture, &sink, &ctx).await?;
        match outcome {
            Outcome::Exited(result) => {
                let output = CommandOutput::new(result, sink.take_lines());
                if let Some(exit_code) = rejected(pipeline, output.result()) {
                    return Err(ExecError::NonZeroExit {
                        command: blamed(pipeline, output.pipe_status()),
                        exit_code,
                        output: Some(Box::new(output)),
                    });
                }
                Ok(output)
            }
            Outcome::Cancelled { reason, result } => Err(ExecError::Cancelled {
                command: pipeline.to_string(),
                reason,
                output: Some(Box::new(CommandOutput::new(result, sink.take_lines()))),
            }),
        }
    }

    pub fn stream_pipeline(&self, pipeline: &Pipeline) -> OutputStream {
        // Resolve task-local mocks here, before leaving the caller's task
        let mocks = self.active_mocks();
        OutputStream::start(self.clone(), mocks, pipeline.clone())
    }

    async fn settle_status(
        &self,
        pipeline: &Pipeline,
        mode: Mode,
    ) -> Result<ExecutionResult, ExecError> {
        // Mocked output has nowhere else to go in pass-through modes
        let sink = Aggregator::new(Route::Forward);
        let ctx = self.context(None);
        let outcome = self.dispatch(pipeline, mode, &sink, &ctx).await?;
        settle(pipeline, outcome)
    }

    /// Intercept when mocking is active, otherwise spawn.
    async fn dispatch(
        &self,
        pipeline: &Pipeline,
        mode: Mode,
        sink: &Aggregator,
        ctx: &RunContext,
    ) -> Result<Outcome, ExecError> {
        match self.active_mocks() {
            Some(mocks) => mocks.intercept(pipeline, sink, &ctx.cancel).await,
            None => run::execute(pipeline, mode, sink, ctx).await,
        }
    }

    /// Same as [`dispatch`](Self::dispatch) with mocks resolved by the caller.
    pub(crate) async fn dispatch_with(
        &self,
        mocks: Option<&MockHandle>,
        pipeline: &Pipeline,
        sink: &Aggregator,
        ctx: &RunContext,
    ) -> Result<Outcome, ExecError> {
        match mocks {
            Some(mocks) => mocks.intercept(pipeline, sink, &ctx.cancel).await,
            None => run::execute(pipeline, Mode::Stream, sink, ctx).await,
        }
    }

    fn active_mocks(&self) -> Option<MockHandle> {
        self.mocks.clone().or_else(MockHandle::current)
    }

    pub(crate) fn context(&self, cancel: Option<&CancellationToken>) -> RunContext {
        RunContext {
            cancel: Cancellation::new(cancel.or(self.cancel.as_ref()), self.timeout),
            kill_grace: self.kill_grace,
            drain_grace: self.drain_grace,
            snippet_limit: self.snippet_limit,
        }
    }

    pub(crate) fn cancel(&self) -> Option<&CancellationToken> {
        self.cancel.as_ref()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply validation to an outcome that retained no output.
pub(crate) fn settle(pipeline: &Pipeline, outcome: Outcome) -> Result<ExecutionResult, ExecError> {
    match outcome {
        Outcome::Exited(result) => match rejected(pipeline, &result) {
            Some(exit_code) => Err(ExecError::NonZeroExit {
                command: blamed(pipeline, &result.pipe_status),
                exit_code,
                output: None,
            }),
            None => Ok(result),
        },
        Outcome::Cancelled { reason, .. } => Err(ExecError::Cancelled {
            command: pipeline.to_string(),
            reason,
            output: None,
        }),
    }
}

/// The exit code to raise, if the last stage's policy rejects it.
fn rejected(pipeline: &Pipeline, result: &ExecutionResult) -> Option<i32> {
    let last = pipeline.last()?;
    last.rejects(result.exit_code).then_some(result.exit_code)
}

/// Render the stage responsible for a failure, or the whole pipeline.
fn blamed(pipeline: &Pipeline, pipe_status: &[i32]) -> String {
    match pipeline.failing_stage(pipe_status) {
        Some(i) if pipeline.len() > 1 => pipeline.stages()[i].to_string(),
        _ => pipeline.to_string(),
    }
}

#[cfg(test)]
#[path = "executor_tests/mod.rs"]
mod tests;
