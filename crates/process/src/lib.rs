// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cmdr-process: async execution of commands and pipelines
//!
//! Spawns programs described by [`cmdr_core::CommandSpec`], drains their
//! output without deadlock, chains pipeline stages with OS pipes, stops
//! children on cancellation, and lets tests intercept all of it with
//! task-scoped mocks.

mod aggregate;
mod cancel;
mod drain;
pub mod env;
mod error;
mod executor;
mod mock;
mod run;
mod stream;

pub use error::{CancelReason, ExecError};
pub use executor::Executor;
pub use mock::{ArgPattern, MockCall, MockError, MockHandle, MockScope, MockSetup};
pub use stream::{OutputStream, Selection};
