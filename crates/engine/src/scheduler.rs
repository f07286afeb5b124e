// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trigger queue, jittered timer, and the single run-executor task.
//!
//! The timer and manual requests feed one queue of capacity one, drained by
//! one executor task, so runs never overlap and bursts coalesce into at most
//! one pending run.

use std::time::Duration;

use ap_core::ErrorKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::coordinator::{RunCoordinator, RunOutcome};

const QUEUE_CAPACITY: usize = 1;

/// Why a run was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Startup,
    Timer,
    Manual,
}

ap_core::simple_display! {
    TriggerSource {
        Startup => "startup",
        Timer => "timer",
        Manual => "manual",
    }
}

/// Non-blocking handle for requesting runs.
#[derive(Debug, Clone)]
pub struct Trigger {
    tx: mpsc::Sender<TriggerSource>,
}

impl Trigger {
    /// Request a run. Returns false when one is already pending.
    pub fn request(&self, source: TriggerSource) -> bool {
        match self.tx.try_send(source) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(%source, "run already pending, coalescing trigger");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(%source, "run executor has stopped, dropping trigger");
                false
            }
        }
    }
}

/// Receiving side of the trigger queue.
pub type TriggerReceiver = mpsc::Receiver<TriggerSource>;

pub fn trigger_queue() -> (Trigger, TriggerReceiver) {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    (Trigger { tx }, rx)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule period must be non-zero")]
    ZeroPeriod,

    #[error("jitter {jitter:?} must be less than the period {period:?}")]
    JitterTooLarge { period: Duration, jitter: Duration },
}

impl ScheduleError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Fixed period with optional symmetric jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    period: Duration,
    jitter: Duration,
}

impl Schedule {
    pub fn new(period: Duration, jitter: Duration) -> Result<Self, ScheduleError> {
        if period.is_zero() {
            return Err(ScheduleError::ZeroPeriod);
        }
        if jitter >= period {
            return Err(ScheduleError::JitterTooLarge { period, jitter });
        }
        Ok(Self { period, jitter })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Gap until the next tick, uniform in `[period - jitter, period + jitter)`.
    pub fn next_gap<R: Rng>(&self, rng: &mut R) -> Duration {
        if self.jitter.is_zero() {
            return self.period;
        }
        rng.gen_range(self.period - self.jitter..self.period + self.jitter)
    }
}

/// Request a run after every schedule gap until cancelled.
pub fn spawn_timer(schedule: Schedule, trigger: Trigger, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        loop {
            let gap = schedule.next_gap(&mut rng);
            tracing::debug!(gap_secs = gap.as_secs(), "next scheduled run");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(gap) => {
                    trigger.request(TriggerSource::Timer);
                }
            }
        }
        tracing::debug!("timer stopped");
    })
}

/// Drain the queue, one run at a time, until cancelled or every trigger is gone.
///
/// Cancellation is only observed between runs.
pub async fn run_executor(mut coordinator: RunCoordinator, mut rx: TriggerReceiver, cancel: CancellationToken) {
    loop {
        let source = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(source) => source,
                None => break,
            },
        };
        tracing::info!(%source, "run triggered");
        match coordinator.run_once().await {
            RunOutcome::Failed(kind) => tracing::warn!(%kind, "waiting for next trigger after failed run"),
            RunOutcome::Succeeded | RunOutcome::Skipped => {}
        }
    }
    tracing::debug!("run executor stopped");
}

/// The running timer and executor tasks.
pub struct Scheduler {
    trigger: Trigger,
    cancel: CancellationToken,
    timer: JoinHandle<()>,
    executor: JoinHandle<()>,
}

impl Scheduler {
    /// Start both tasks. The first run is queued immediately.
    pub fn start(coordinator: RunCoordinator, schedule: Schedule) -> Self {
        let (trigger, rx) = trigger_queue();
        let cancel = CancellationToken::new();
        trigger.request(TriggerSource::Startup);
        let executor = tokio::spawn(run_executor(coordinator, rx, cancel.clone()));
        let timer = spawn_timer(schedule, trigger.clone(), cancel.clone());
        tracing::info!(
            period_secs = schedule.period().as_secs(),
            jitter_secs = schedule.jitter().as_secs(),
            "scheduler started"
        );
        Self { trigger, cancel, timer, executor }
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger.clone()
    }

    /// Stop the timer and wait for the executor to finish its current run.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.timer.await {
            tracing::warn!(error = %e, "timer task ended abnormally");
        }
        if let Err(e) = self.executor.await {
            tracing::warn!(error = %e, "run executor ended abnormally");
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
