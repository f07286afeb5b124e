// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ansible-puller daemon library
//!
//! Configuration, logging, metrics, the HTTP control surface, and the
//! startup/shutdown lifecycle used by the `ansible-puller` binary.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod logging;
pub mod metrics;

pub use config::{Args, Config, ConfigError, FileConfig, Source};
pub use lifecycle::{run_once, startup, Daemon, LifecycleError, Signals};
pub use listener::{router, ListenCtx, StatusBody};
pub use metrics::{MetricsError, PullerMetrics};
