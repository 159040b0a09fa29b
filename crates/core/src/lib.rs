// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cmdr-core: data model for describing and reporting external program runs

pub mod command;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod result;

pub use command::{CommandSpec, Stdin, Validation};
pub use output::{CommandOutput, OutputLine, Stream};
pub use pipeline::Pipeline;
pub use render::quote;
pub use result::ExecutionResult;
