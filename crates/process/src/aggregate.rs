// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered sink for output fragments from one invocation.

use cmdr_core::{OutputLine, Stream};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Where appended fragments go besides receiving a sequence number.
#[derive(Debug)]
pub(crate) enum Route {
    /// Retain every fragment for a [`cmdr_core::CommandOutput`].
    Capture,
    /// Write each line to the caller's own stdout/stderr as it arrives.
    Forward,
    /// Hand each fragment to a consumer.
    Channel(mpsc::UnboundedSender<OutputLine>),
}

#[derive(Debug)]
struct Inner {
    started: Instant,
    next_seq: u64,
    lines: Vec<OutputLine>,
    route: Route,
}

/// Cloneable handle to a single invocation's fragment sequence.
///
/// Sequence numbers are assigned under the lock, so the order fragments
/// are stored or sent in is exactly the order they were appended. The lock
/// is held only for one append and never across a terminal write.
#[derive(Debug, Clone)]
pub(crate) struct Aggregator {
    inner: Arc<Mutex<Inner>>,
}

impl Aggregator {
    pub(crate) fn new(route: Route) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                started: Instant::now(),
                next_seq: 0,
                lines: Vec::new(),
                route,
            })),
        }
    }

    pub(crate) fn push(&self, stream: Stream, text: String) {
        let forwarded = {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            let line = OutputLine {
                stream,
                text,
                seq: inner.next_seq,
                elapsed: inner.started.elapsed(),
            };
            inner.next_seq += 1;
            match &inner.route {
                Route::Capture => {
                    inner.lines.push(line);
                    None
                }
                Route::Forward => Some(line),
                // Receiver gone means the consumer stopped listening
                Route::Channel(tx) => {
                    let _ = tx.send(line);
                    None
                }
            }
        };
        // Terminal writes can block, so they happen after the lock is released
        if let Some(line) = forwarded {
            forward(&line);
        }
    }

    /// Number of fragments appended so far, whatever the route.
    pub(crate) fn count(&self) -> u64 {
        self.inner.lock().next_seq
    }

    /// Move the retained fragments out.
    pub(crate) fn take_lines(&self) -> Vec<OutputLine> {
        std::mem::take(&mut self.inner.lock().lines)
    }
}

fn forward(line: &OutputLine) {
    let result = match line.stream {
        Stream::Stdout => writeln!(std::io::stdout().lock(), "{}", line.text),
        Stream::Stderr => writeln!(std::io::stderr().lock(), "{}", line.text),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, "failed to forward output line");
    }
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;
