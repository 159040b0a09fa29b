// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit status and timing of an invocation that did not retain output.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Outcome of a streamed, forwarded or pass-through invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code the caller observes (after pipeline reduction).
    pub exit_code: i32,
    /// Exit code of every stage, first to last.
    pub pipe_status: Vec<i32>,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

impl ExecutionResult {
    /// Result for a single command.
    pub fn single(exit_code: i32, started_at: SystemTime, finished_at: SystemTime) -> Self {
        Self {
            exit_code,
            pipe_status: vec![exit_code],
            started_at,
            finished_at,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn duration(&self) -> Duration {
        self.finished_at
            .duration_since(self.started_at)
            .unwrap_or_default()
    }
}
