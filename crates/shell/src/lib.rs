// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ap-shell: bounded execution of external commands
//!
//! Runs one binary per [`CommandSpec`](ap_core::CommandSpec) under a deadline,
//! capturing stdout/stderr and optionally relaying them line by line to an
//! [`OutputSink`]. Every outcome, including spawn failures and deadline
//! expiry, is reported inside the returned
//! [`CommandResult`](ap_core::CommandResult).

mod executor;
pub mod path;
mod sink;

pub use executor::CommandExecutor;
pub use path::ensure_on_path;
pub use sink::{MemorySink, OutputSink, StdioSink};
