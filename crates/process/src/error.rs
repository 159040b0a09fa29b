// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution error types.

use cmdr_core::CommandOutput;
use std::fmt;
use std::time::Duration;

/// Why a running invocation was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Cancelled,
    /// The configured timeout elapsed.
    TimedOut(Duration),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Cancelled => f.write_str("was cancelled"),
            CancelReason::TimedOut(after) => write!(f, "timed out after {}ms", after.as_millis()),
        }
    }
}

/// Errors that can occur while running a command or pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Executable not found or could not be started.
    #[error("failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    /// Nonzero exit under the fail-on-nonzero validation policy.
    #[error("command `{command}` failed with exit code {exit_code}")]
    NonZeroExit {
        command: String,
        exit_code: i32,
        /// Captured output, when the invocation captured any.
        output: Option<Box<CommandOutput>>,
    },

    /// Stopped by cancellation or timeout before it finished.
    #[error("command `{command}` {reason}")]
    Cancelled {
        command: String,
        reason: CancelReason,
        /// Output captured up to the point of cancellation.
        output: Option<Box<CommandOutput>>,
    },

    /// Reading output or waiting for the child failed.
    #[error("i/o error running `{command}`: {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },

    #[error("pipeline has no stages")]
    EmptyPipeline,

    /// Mocking is active but no setup matches the invocation.
    #[error("no mock configured for `{command}`")]
    NoMock { command: String },

    /// A mock setup was configured to raise.
    #[error("mock for `{command}` raised: {message}")]
    MockFault { command: String, message: String },
}

impl ExecError {
    /// Output carried by a failed or cancelled capture.
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            ExecError::NonZeroExit { output, .. } | ExecError::Cancelled { output, .. } => {
                output.as_deref()
            }
            _ => None,
        }
    }

    /// Exit code for nonzero-exit failures.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExecError::NonZeroExit { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ExecError::Cancelled {
                reason: CancelReason::TimedOut(_),
                ..
            }
        )
    }
}
