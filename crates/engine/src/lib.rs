// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ap-engine: Run pipeline, coordinator and scheduler

mod coordinator;
mod error;
mod pipeline;
mod playbook;
mod scheduler;
mod telemetry;

pub use coordinator::{RunCoordinator, RunOutcome};
pub use error::RunError;
pub use pipeline::{Pipeline, PipelineConfig, RunPipeline, ERROR_LOG, OUTPUT_LOG};
pub use playbook::{PlaybookRun, PlaybookRunner};
pub use scheduler::{
    run_executor, spawn_timer, trigger_queue, Schedule, ScheduleError, Scheduler, Trigger, TriggerReceiver,
    TriggerSource,
};
pub use telemetry::{NoopTelemetry, RunTelemetry};

#[cfg(any(test, feature = "test-support"))]
pub use coordinator::FakePipeline;
#[cfg(any(test, feature = "test-support"))]
pub use telemetry::{FakeTelemetry, TelemetryEvent};
