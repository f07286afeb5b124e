// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wraps each pipeline execution with run state, telemetry, and a run span.

use std::sync::Arc;
use std::time::Instant;

use ap_core::{ErrorKind, RunStateHandle, RunWriter};
use tracing::Instrument;
use uuid::Uuid;

use crate::pipeline::Pipeline;
use crate::telemetry::RunTelemetry;

/// How a requested run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Runs are disabled; nothing was done.
    Skipped,
    Succeeded,
    Failed(ErrorKind),
}

/// Sole owner of the run-state writer.
pub struct RunCoordinator {
    pipeline: Arc<dyn Pipeline>,
    writer: RunWriter,
    telemetry: Arc<dyn RunTelemetry>,
}

impl RunCoordinator {
    pub fn new(pipeline: Arc<dyn Pipeline>, writer: RunWriter, telemetry: Arc<dyn RunTelemetry>) -> Self {
        Self { pipeline, writer, telemetry }
    }

    pub fn state(&self) -> RunStateHandle {
        self.writer.handle()
    }

    /// Execute the pipeline once unless runs are disabled.
    pub async fn run_once(&mut self) -> RunOutcome {
        if self.writer.handle().is_disabled() {
            tracing::info!("run requested while disabled, skipping");
            return RunOutcome::Skipped;
        }
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.run_tracked().instrument(span).await
    }

    async fn run_tracked(&mut self) -> RunOutcome {
        let guard = self.writer.begin();
        self.telemetry.run_started();
        let started = Instant::now();

        let result = self.pipeline.execute().await;
        let elapsed = started.elapsed();
        let outcome = match result {
            Ok(()) => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "run succeeded");
                RunOutcome::Succeeded
            }
            Err(e) => {
                tracing::error!(kind = %e.kind(), error = %e, "run failed");
                RunOutcome::Failed(e.kind())
            }
        };

        let success = outcome == RunOutcome::Succeeded;
        guard.finish(success);
        self.telemetry.run_finished(success, elapsed);
        outcome
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use crate::error::RunError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakePipelineState {
        executions: usize,
        delay: Duration,
        failure: Option<fn() -> RunError>,
    }

    /// Pipeline that counts executions, optionally sleeping or failing.
    #[derive(Clone, Default)]
    pub struct FakePipeline {
        inner: Arc<Mutex<FakePipelineState>>,
    }

    impl FakePipeline {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make each execution take `delay` (tokio time).
        pub fn set_delay(&self, delay: Duration) {
            self.inner.lock().delay = delay;
        }

        /// Make each execution fail with the error `make` builds.
        pub fn fail_with(&self, make: fn() -> RunError) {
            self.inner.lock().failure = Some(make);
        }

        pub fn executions(&self) -> usize {
            self.inner.lock().executions
        }
    }

    #[async_trait]
    impl Pipeline for FakePipeline {
        async fn execute(&self) -> Result<(), RunError> {
            let (delay, failure) = {
                let mut state = self.inner.lock();
                state.executions += 1;
                (state.delay, state.failure)
            };
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(make) => Err(make()),
                None => Ok(()),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakePipeline;

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
