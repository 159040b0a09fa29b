// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawn, drain and wait: the process-level execution loop.
//!
//! A single command is run as a one-stage pipeline, so every mode goes
//! through the same spawn and supervision path.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, SystemTime};

use cmdr_core::{CommandSpec, ExecutionResult, Pipeline, Stdin};
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::aggregate::Aggregator;
use crate::cancel::{self, Cancellation};
use crate::drain;
use crate::error::{CancelReason, ExecError};

/// How the final stage's output reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Lines are read and forwarded live to the caller's stdout/stderr.
    Forward,
    /// Lines are read and retained.
    Capture,
    /// Lines are read and sent to a consumer.
    Stream,
    /// The child writes straight to the caller's stdout/stderr.
    Passthrough,
    /// The child owns the caller's terminal: all three handles inherited.
    Interactive,
}

impl Mode {
    fn reads_output(self) -> bool {
        matches!(self, Mode::Forward | Mode::Capture | Mode::Stream)
    }

    /// Whether intermediate stages' stderr is collected into a snippet
    /// instead of reaching the caller's terminal.
    fn hides_intermediate_stderr(self) -> bool {
        matches!(self, Mode::Capture | Mode::Stream)
    }

    fn output_stdio(self) -> Stdio {
        if self.reads_output() {
            Stdio::piped()
        } else {
            Stdio::inherit()
        }
    }
}

/// Settings for one invocation.
#[derive(Debug)]
pub(crate) struct RunContext {
    pub(crate) cancel: Cancellation,
    pub(crate) kill_grace: Duration,
    pub(crate) drain_grace: Duration,
    pub(crate) snippet_limit: usize,
}

/// How an invocation ended, before validation is applied.
#[derive(Debug)]
pub(crate) enum Outcome {
    Exited(ExecutionResult),
    Cancelled {
        reason: CancelReason,
        result: ExecutionResult,
    },
}

/// Run every stage of `pipeline`, routing the final stage's output into
/// `sink` according to `mode`.
pub(crate) async fn execute(
    pipeline: &Pipeline,
    mode: Mode,
    sink: &Aggregator,
    ctx: &RunContext,
) -> Result<Outcome, ExecError> {
    if pipeline.is_empty() {
        return Err(ExecError::EmptyPipeline);
    }
    let span = tracing::info_span!(
        "cmdr.cmd",
        cmd = %pipeline,
        stages = pipeline.len(),
        mode = ?mode,
        exit_code = tracing::field::Empty,
        duration_ms = tracing::field::Empty,
    );
    let outcome = execute_stages(pipeline, mode, sink, ctx)
        .instrument(span.clone())
        .await?;
    let result = match &outcome {
        Outcome::Exited(result) | Outcome::Cancelled { result, .. } => result,
    };
    span.record("exit_code", result.exit_code);
    span.record("duration_ms", result.duration().as_millis() as u64);
    Ok(outcome)
}

async fn execute_stages(
    pipeline: &Pipeline,
    mode: Mode,
    sink: &Aggregator,
    ctx: &RunContext,
) -> Result<Outcome, ExecError> {
    if let Some(reason) = ctx.cancel.fired() {
        return Err(ExecError::Cancelled {
            command: pipeline.to_string(),
            reason,
            output: None,
        });
    }

    let started_at = SystemTime::now();
    let mut spawned = spawn_stages(pipeline, mode, ctx).await?;

    // Phase 3: drain the final stage's output.
    let stop = CancellationToken::new();
    let mut drain_task = if mode.reads_output() {
        let (stdout, stderr) = match spawned.children.last_mut() {
            Some(child) => (child.stdout.take(), child.stderr.take()),
            None => (None, None),
        };
        Some(tokio::spawn(drain::drain(
            stdout,
            stderr,
            sink.clone(),
            stop.clone(),
        )))
    } else {
        None
    };

    // Phase 4: wait for end-of-stream, then for every stage to exit.
    let mut drained = false;
    let mut read_error = None;
    let waited = {
        let finished = async {
            if let Some(task) = drain_task.as_mut() {
                read_error = drain_failure(task.await);
                drained = true;
            }
            wait_all(&mut spawned.children).await
        };
        tokio::select! {
            statuses = finished => Ok(statuses),
            reason = ctx.cancel.triggered() => Err(reason),
        }
    };

    match waited {
        Ok(statuses) => {
            let statuses = statuses.map_err(|source| ExecError::Io {
                command: pipeline.to_string(),
                source,
            })?;
            spawned.finish_helpers().await;
            // Reported only once every stage has been reaped
            if let Some(source) = read_error {
                tracing::warn!(error = %source, lines = sink.count(), "output read failed");
                return Err(ExecError::Io {
                    command: pipeline.to_string(),
                    source,
                });
            }
            let pipe_status: Vec<i32> = statuses.iter().map(exit_code).collect();
            tracing::debug!(lines = sink.count(), ?pipe_status, "stages exited");
            for (i, stderr) in spawned.snippets.iter().enumerate() {
                if pipe_status[i] != 0 && !stderr.is_empty() {
                    tracing::warn!(
                        stage = i,
                        exit_code = pipe_status[i],
                        %stderr,
                        "pipeline stage failed"
                    );
                }
            }
            Ok(Outcome::Exited(ExecutionResult {
                exit_code: pipeline.exit_code(&pipe_status),
                pipe_status,
                started_at,
                finished_at: SystemTime::now(),
            }))
        }
        Err(reason) => {
            tracing::info!(%reason, "stopping command");
            cancel::terminate(&mut spawned.children, spawned.group, ctx.kill_grace).await;
            if let Some(mut task) = drain_task.take().filter(|_| !drained) {
                // Children are gone; let readers reach end-of-stream unless a
                // stray descendant still holds the pipe open.
                if tokio::time::timeout(ctx.drain_grace, &mut task).await.is_err() {
                    stop.cancel();
                    let _ = task.await;
                }
            }
            spawned.abort_helpers();
            let pipe_status: Vec<i32> = spawned
                .children
                .iter_mut()
                .map(|c| c.try_wait().ok().flatten().map_or(-1, |s| exit_code(&s)))
                .collect();
            Ok(Outcome::Cancelled {
                reason,
                result: ExecutionResult {
                    exit_code: pipeline.exit_code(&pipe_status),
                    pipe_status,
                    started_at,
                    finished_at: SystemTime::now(),
                },
            })
        }
    }
}

/// Children of a running pipeline plus the helper tasks feeding them.
struct Spawned {
    children: Vec<Child>,
    /// Process group shared by every stage, when one was created.
    group: Option<u32>,
    stdin_writer: Option<JoinHandle<()>>,
    snippet_tasks: Vec<Option<JoinHandle<String>>>,
    /// Leading stderr of each intermediate stage, once collected.
    snippets: Vec<String>,
}

impl Spawned {
    async fn finish_helpers(&mut self) {
        if let Some(writer) = self.stdin_writer.take() {
            let _ = writer.await;
        }
        for task in &mut self.snippet_tasks {
            let text = match task.take() {
                Some(handle) => handle.await.unwrap_or_default(),
                None => String::new(),
            };
            self.snippets.push(text);
        }
    }

    fn abort_helpers(&mut self) {
        if let Some(writer) = self.stdin_writer.take() {
            writer.abort();
        }
        for task in self.snippet_tasks.iter_mut().filter_map(Option::take) {
            task.abort();
        }
    }
}

/// Phase 1-2: spawn every stage back to back, wiring stage i's stdout to
/// stage i+1's stdin with an OS pipe.
async fn spawn_stages(
    pipeline: &Pipeline,
    mode: Mode,
    ctx: &RunContext,
) -> Result<Spawned, ExecError> {
    let stages = pipeline.stages();
    let n = stages.len();
    // A child that shares the caller's terminal must stay in its process group
    let use_group = cfg!(unix)
        && mode != Mode::Interactive
        && stages[0].get_stdin() != &Stdin::Inherit;

    let mut spawned = Spawned {
        children: Vec::with_capacity(n),
        group: None,
        stdin_writer: None,
        snippet_tasks: Vec::with_capacity(n),
        snippets: Vec::with_capacity(n),
    };
    let mut upstream: Option<Stdio> = None;

    for (i, stage) in stages.iter().enumerate() {
        let last = i == n - 1;
        let mut process = command_for(stage);

        let stdin = match upstream.take() {
            Some(pipe) => pipe,
            None if mode == Mode::Interactive => Stdio::inherit(),
            None => stdin_stdio(stage.get_stdin()),
        };
        process.stdin(stdin);

        if last {
            process.stdout(mode.output_stdio());
            process.stderr(mode.output_stdio());
        } else {
            process.stdout(Stdio::piped());
            process.stderr(if mode.hides_intermediate_stderr() {
                Stdio::piped()
            } else {
                Stdio::inherit()
            });
        }

        #[cfg(unix)]
        if use_group {
            process.process_group(spawned.group.map_or(0, |pgid| pgid as i32));
        }

        tracing::debug!(stage = i, cmd = %stage, "spawning");
        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(source) => {
                cancel::terminate(&mut spawned.children, spawned.group, ctx.kill_grace).await;
                spawned.abort_helpers();
                return Err(ExecError::SpawnFailed {
                    command: stage.to_string(),
                    source,
                });
            }
        };
        if use_group && spawned.group.is_none() {
            spawned.group = child.id();
        }

        if i == 0 {
            if let (Stdin::Text(text), Some(pipe)) = (stage.get_stdin(), child.stdin.take()) {
                spawned.stdin_writer = Some(tokio::spawn(write_stdin(pipe, text.clone())));
            }
        }

        if last {
            spawned.snippet_tasks.push(None);
        } else {
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            spawned.snippet_tasks.push(
                stderr.map(|err| tokio::spawn(drain::snippet(err, ctx.snippet_limit))),
            );
            spawned.children.push(child);
            let pipe: Option<std::io::Result<Stdio>> = stdout.map(|out| out.try_into());
            match pipe.transpose() {
                Ok(pipe) => upstream = pipe,
                Err(source) => {
                    cancel::terminate(&mut spawned.children, spawned.group, ctx.kill_grace).await;
                    spawned.abort_helpers();
                    return Err(ExecError::Io {
                        command: stage.to_string(),
                        source,
                    });
                }
            }
            continue;
        }
        spawned.children.push(child);
    }

    Ok(spawned)
}

fn command_for(spec: &CommandSpec) -> tokio::process::Command {
    let mut process = tokio::process::Command::new(spec.get_program());
    process.args(spec.get_args());
    if let Some(cwd) = spec.get_cwd() {
        process.current_dir(cwd);
    }
    process.envs(spec.get_env());
    process.kill_on_drop(true);
    process
}

fn stdin_stdio(stdin: &Stdin) -> Stdio {
    match stdin {
        Stdin::Null => Stdio::null(),
        Stdin::Text(_) => Stdio::piped(),
        Stdin::Inherit => Stdio::inherit(),
    }
}

/// Write `text` and close the pipe so the child sees end-of-input.
async fn write_stdin(mut pipe: ChildStdin, text: String) {
    match pipe.write_all(text.as_bytes()).await {
        Ok(()) => tracing::debug!(bytes = text.len(), "wrote stdin"),
        // The child exited or closed stdin without reading everything
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
        Err(e) => tracing::debug!(error = %e, "stdin write failed"),
    }
    let _ = pipe.shutdown().await;
}

/// The error, if any, that ended draining before end-of-stream.
fn drain_failure(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Option<std::io::Error> {
    match joined {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(e),
        Err(e) => Some(std::io::Error::other(e)),
    }
}

async fn wait_all(children: &mut [Child]) -> std::io::Result<Vec<ExitStatus>> {
    futures_util::future::try_join_all(children.iter_mut().map(Child::wait)).await
}

/// Exit code of a status, using the shell's 128+N convention for signals.
pub(crate) fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    -1
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
