// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command descriptor: what to run, where, and how to judge the result.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::pipeline::Pipeline;

/// Where a child's standard input comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "text")]
pub enum Stdin {
    /// No input; the child reads end-of-file immediately.
    #[default]
    Null,
    /// Literal text written to the child, then the pipe is closed.
    Text(String),
    /// The child shares the caller's stdin handle.
    Inherit,
}

/// How a nonzero exit code is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    /// Nonzero exit is an error carrying whatever output was captured.
    #[default]
    ZeroExitCode,
    /// Nonzero exit is returned as an unsuccessful result.
    None,
}

/// Immutable description of one external program invocation.
///
/// Built by chaining the consuming setters below, then handed by reference
/// to an executor. Arguments are passed to the OS verbatim and are never
/// re-parsed by a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: IndexMap<String, String>,
    stdin: Stdin,
    validation: Validation,
}

impl CommandSpec {
    /// Describe an invocation of `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: IndexMap::new(),
            stdin: Stdin::Null,
            validation: Validation::ZeroExitCode,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments in order.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the child.
    pub fn cwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.cwd = Some(path.into());
        self
    }

    /// Override one environment variable. Later writes to the same name win.
    pub fn env(mut self, key: impl Into<String>, val: impl Into<String>) -> Self {
        self.env.insert(key.into(), val.into());
        self
    }

    /// Override several environment variables.
    pub fn envs(
        mut self,
        vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        for (k, v) in vars {
            self.env.insert(k.into(), v.into());
        }
        self
    }

    /// Write `text` to the child's stdin and close it.
    pub fn stdin_text(mut self, text: impl Into<String>) -> Self {
        self.stdin = Stdin::Text(text.into());
        self
    }

    /// Set the stdin source.
    pub fn stdin(mut self, stdin: Stdin) -> Self {
        self.stdin = stdin;
        self
    }

    /// Set the validation policy.
    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// Shorthand for `validation(Validation::None)`.
    pub fn unchecked(self) -> Self {
        self.validation(Validation::None)
    }

    /// Chain this command's stdout into `next`'s stdin.
    pub fn pipe(self, next: CommandSpec) -> Pipeline {
        Pipeline::new(self).pipe(next)
    }

    pub fn get_program(&self) -> &str {
        &self.program
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Environment overrides in first-insertion order.
    pub fn get_env(&self) -> &IndexMap<String, String> {
        &self.env
    }

    pub fn get_stdin(&self) -> &Stdin {
        &self.stdin
    }

    pub fn get_validation(&self) -> Validation {
        self.validation
    }

    /// Whether `exit_code` should be raised as an error under this policy.
    pub fn rejects(&self, exit_code: i32) -> bool {
        self.validation == Validation::ZeroExitCode && exit_code != 0
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
