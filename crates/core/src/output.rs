// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Captured output: tagged line fragments and their derived views.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use crate::result::ExecutionResult;

/// Which child stream a fragment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    Stdout,
    Stderr,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// One line of child output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: Stream,
    pub text: String,
    /// Position in the invocation's arrival order, starting at 0.
    pub seq: u64,
    /// Time since the invocation started.
    pub elapsed: Duration,
}

impl OutputLine {
    pub fn is_stdout(&self) -> bool {
        self.stream == Stream::Stdout
    }

    pub fn is_stderr(&self) -> bool {
        self.stream == Stream::Stderr
    }
}

/// Materialized result of a captured invocation.
///
/// Owns the fragments in arrival order. The stdout, stderr and combined
/// strings are derived on first access and cached; the fragment list is
/// never copied or mutated after construction.
#[derive(Debug)]
pub struct CommandOutput {
    result: ExecutionResult,
    lines: Vec<OutputLine>,
    stdout: OnceLock<String>,
    stderr: OnceLock<String>,
    combined: OnceLock<String>,
    #[cfg(test)]
    derivations: std::sync::atomic::AtomicUsize,
}

impl CommandOutput {
    pub fn new(result: ExecutionResult, lines: Vec<OutputLine>) -> Self {
        Self {
            result,
            lines,
            stdout: OnceLock::new(),
            stderr: OnceLock::new(),
            combined: OnceLock::new(),
            #[cfg(test)]
            derivations: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Stdout lines joined with `\n`, in arrival order.
    pub fn stdout(&self) -> &str {
        self.stdout.get_or_init(|| self.join(Some(Stream::Stdout)))
    }

    /// Stderr lines joined with `\n`, in arrival order.
    pub fn stderr(&self) -> &str {
        self.stderr.get_or_init(|| self.join(Some(Stream::Stderr)))
    }

    /// All lines joined with `\n`, in the exact interleaving observed.
    pub fn combined(&self) -> &str {
        self.combined.get_or_init(|| self.join(None))
    }

    /// Stdout split into lines.
    pub fn lines(&self) -> Vec<&str> {
        self.texts(Some(Stream::Stdout))
    }

    pub fn stderr_lines(&self) -> Vec<&str> {
        self.texts(Some(Stream::Stderr))
    }

    pub fn combined_lines(&self) -> Vec<&str> {
        self.texts(None)
    }

    /// Tagged fragments in arrival order.
    pub fn fragments(&self) -> &[OutputLine] {
        &self.lines
    }

    pub fn into_fragments(self) -> Vec<OutputLine> {
        self.lines
    }

    pub fn exit_code(&self) -> i32 {
        self.result.exit_code
    }

    pub fn success(&self) -> bool {
        self.result.success()
    }

    /// Exit code of every stage; a single command has one entry.
    pub fn pipe_status(&self) -> &[i32] {
        &self.result.pipe_status
    }

    pub fn duration(&self) -> Duration {
        self.result.duration()
    }

    pub fn result(&self) -> &ExecutionResult {
        &self.result
    }

    fn texts(&self, stream: Option<Stream>) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| stream.is_none_or(|s| l.stream == s))
            .map(|l| l.text.as_str())
            .collect()
    }

    fn join(&self, stream: Option<Stream>) -> String {
        #[cfg(test)]
        self.derivations
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.texts(stream).join("\n")
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
