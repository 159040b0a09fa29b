// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline descriptor: stages whose stdout feeds the next stage's stdin.

use serde::{Deserialize, Serialize};

use crate::command::CommandSpec;

/// Ordered list of stages. Only the last stage's output reaches the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    stages: Vec<CommandSpec>,
    pipefail: bool,
}

impl Pipeline {
    /// Start a pipeline with a single stage.
    pub fn new(first: CommandSpec) -> Self {
        Self {
            stages: vec![first],
            pipefail: false,
        }
    }

    /// Build a pipeline from any number of stages (possibly none).
    pub fn from_stages(stages: impl IntoIterator<Item = CommandSpec>) -> Self {
        Self {
            stages: stages.into_iter().collect(),
            pipefail: false,
        }
    }

    /// Append a stage.
    pub fn pipe(mut self, next: CommandSpec) -> Self {
        self.stages.push(next);
        self
    }

    /// Enable or disable pipefail mode.
    ///
    /// When enabled, the pipeline reports the exit code of the rightmost
    /// stage that failed (non-zero) rather than the last stage's. If all
    /// stages succeed, it reports 0.
    pub fn pipefail(mut self, enabled: bool) -> Self {
        self.pipefail = enabled;
        self
    }

    pub fn stages(&self) -> &[CommandSpec] {
        &self.stages
    }

    pub fn is_pipefail(&self) -> bool {
        self.pipefail
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The stage whose output and validation policy the caller observes.
    pub fn last(&self) -> Option<&CommandSpec> {
        self.stages.last()
    }

    /// Reduce per-stage exit codes to the pipeline's exit code.
    pub fn exit_code(&self, pipe_status: &[i32]) -> i32 {
        if self.pipefail {
            pipe_status.iter().rev().copied().find(|c| *c != 0).unwrap_or(0)
        } else {
            pipe_status.last().copied().unwrap_or(0)
        }
    }

    /// Index of the stage blamed for `exit_code` under the current policy.
    pub fn failing_stage(&self, pipe_status: &[i32]) -> Option<usize> {
        if self.pipefail {
            pipe_status.iter().rposition(|c| *c != 0)
        } else {
            match pipe_status.last() {
                Some(c) if *c != 0 => Some(pipe_status.len() - 1),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
