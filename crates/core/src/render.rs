// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable rendering of commands for logs and error messages.
//!
//! Rendered strings are for display only. Execution always passes the
//! argument vector to the OS directly.

use std::borrow::Cow;
use std::fmt;

use crate::command::CommandSpec;
use crate::pipeline::Pipeline;

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '_' | '-' | '.' | '/' | ':' | '=' | '@' | '%' | '+' | ','
        )
}

/// Quote a word so a POSIX shell would read it back as one literal word.
///
/// Words made only of safe characters are returned as-is. Anything else is
/// wrapped in single quotes, with embedded single quotes written as `'\''`.
pub fn quote(word: &str) -> Cow<'_, str> {
    if !word.is_empty() && word.chars().all(is_safe) {
        return Cow::Borrowed(word);
    }
    Cow::Owned(format!("'{}'", word.replace('\'', "'\\''")))
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, val) in self.get_env() {
            write!(f, "{}={} ", key, quote(val))?;
        }
        f.write_str(&quote(self.get_program()))?;
        for arg in self.get_args() {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages().iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
