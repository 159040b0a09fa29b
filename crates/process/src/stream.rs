// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental consumption of a running command's output.

use std::pin::Pin;
use std::task::{Context, Poll};

use cmdr_core::{ExecutionResult, OutputLine, Pipeline, Stream as Source};
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::aggregate::{Aggregator, Route};
use crate::error::ExecError;
use crate::executor::{settle, Executor};
use crate::mock::MockHandle;

/// Which of the final stage's streams a consumer sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Selection {
    /// Both streams in arrival order.
    #[default]
    Combined,
    Stdout,
    Stderr,
}

impl Selection {
    fn admits(self, line: &OutputLine) -> bool {
        match self {
            Selection::Combined => true,
            Selection::Stdout => line.stream == Source::Stdout,
            Selection::Stderr => line.stream == Source::Stderr,
        }
    }
}

/// Lines of a running command, yielded as they arrive.
///
/// Lines are buffered without bound, so a slow consumer never stalls the
/// child. Call [`finish`](Self::finish) for the exit status; dropping the
/// stream before then cancels the command.
#[derive(Debug)]
pub struct OutputStream {
    rx: mpsc::UnboundedReceiver<OutputLine>,
    task: JoinHandle<Result<ExecutionResult, ExecError>>,
    command: String,
    selection: Selection,
    token: CancellationToken,
    guard: Option<DropGuard>,
}

impl OutputStream {
    pub(crate) fn start(executor: Executor, mocks: Option<MockHandle>, pipeline: Pipeline) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let token = executor
            .cancel()
            .map(CancellationToken::child_token)
            .unwrap_or_default();
        let ctx = executor.context(Some(&token));
        let command = pipeline.to_string();

        let task = tokio::spawn(async move {
            let sink = Aggregator::new(Route::Channel(tx));
            let outcome = executor
                .dispatch_with(mocks.as_ref(), &pipeline, &sink, &ctx)
                .await;
            // Close the channel before the status is observable
            drop(sink);
            settle(&pipeline, outcome?)
        });

        Self {
            rx,
            task,
            command,
            selection: Selection::Combined,
            guard: Some(token.clone().drop_guard()),
            token,
        }
    }

    /// Yield only stdout lines.
    pub fn stdout_only(mut self) -> Self {
        self.selection = Selection::Stdout;
        self
    }

    /// Yield only stderr lines.
    pub fn stderr_only(mut self) -> Self {
        self.selection = Selection::Stderr;
        self
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// The next selected line, or `None` once the command's output ends.
    pub async fn next_line(&mut self) -> Option<OutputLine> {
        while let Some(line) = self.rx.recv().await {
            if self.selection.admits(&line) {
                return Some(line);
            }
        }
        None
    }

    /// Stop the command. Lines read before it stopped remain available and
    /// [`finish`](Self::finish) reports [`ExecError::Cancelled`].
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the command to exit and apply its validation policy.
    ///
    /// Unread lines are discarded.
    pub async fn finish(mut self) -> Result<ExecutionResult, ExecError> {
        if let Some(guard) = self.guard.take() {
            guard.disarm();
        }
        match (&mut self.task).await {
            Ok(result) => result,
            Err(e) => Err(ExecError::Io {
                command: self.command.clone(),
                source: std::io::Error::other(e),
            }),
        }
    }
}

impl Stream for OutputStream {
    type Item = OutputLine;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<OutputLine>> {
        let this = self.get_mut();
        loop {
            match this.rx.poll_recv(cx) {
                Poll::Ready(Some(line)) if this.selection.admits(&line) => {
                    return Poll::Ready(Some(line))
                }
                Poll::Ready(Some(_)) => continue,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
