// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ap-core: Shared data model for the ansible-puller daemon

pub mod macros;

pub mod checksum;
pub mod command;
pub mod environment;
pub mod error;
pub mod recap;
pub mod run_state;

pub use checksum::{Checksum, ChecksumError, ChecksumPair};
pub use command::{CommandError, CommandResult, CommandSpec, StreamKind, DEFAULT_COMMAND_DEADLINE};
pub use environment::EnvironmentSpec;
pub use error::ErrorKind;
pub use recap::{HostStats, PlayRecap, RecapError};
pub use run_state::{RunGuard, RunState, RunStateHandle, RunWriter};
