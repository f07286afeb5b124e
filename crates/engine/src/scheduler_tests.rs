// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::coordinator::FakePipeline;
use crate::telemetry::FakeTelemetry;
use ap_core::{RunState, RunStateHandle};
use proptest::prelude::*;
use std::sync::Arc;

const HOUR: Duration = Duration::from_secs(3600);

fn coordinator(pipeline: &FakePipeline) -> (RunCoordinator, RunStateHandle) {
    let (handle, writer) = RunState::shared(None);
    let coordinator = RunCoordinator::new(Arc::new(pipeline.clone()), writer, Arc::new(FakeTelemetry::new()));
    (coordinator, handle)
}

async fn advance(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}

#[yare::parameterized(
    zero_period = { 0, 0, Err(ScheduleError::ZeroPeriod) },
    jitter_equal = { 30, 30, Err(ScheduleError::JitterTooLarge { period: Duration::from_secs(30), jitter: Duration::from_secs(30) }) },
    jitter_larger = { 30, 45, Err(ScheduleError::JitterTooLarge { period: Duration::from_secs(30), jitter: Duration::from_secs(45) }) },
    no_jitter = { 30, 0, Ok(()) },
    some_jitter = { 30, 29, Ok(()) },
)]
fn schedule_validation(period: u64, jitter: u64, expected: Result<(), ScheduleError>) {
    let result = Schedule::new(Duration::from_secs(period), Duration::from_secs(jitter)).map(|_| ());
    assert_eq!(result, expected);
}

#[test]
fn schedule_errors_are_configuration_errors() {
    assert_eq!(ScheduleError::ZeroPeriod.kind(), ErrorKind::Configuration);
}

#[test]
fn zero_jitter_gap_is_exact() {
    let schedule = Schedule::new(Duration::from_secs(1800), Duration::ZERO).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        assert_eq!(schedule.next_gap(&mut rng), Duration::from_secs(1800));
    }
}

proptest! {
    #[test]
    fn jittered_gaps_stay_within_bounds(period in 1u64..100_000, jitter_frac in 0.0f64..1.0, seed in any::<u64>()) {
        let period = Duration::from_millis(period);
        let jitter = period.mul_f64(jitter_frac);
        prop_assume!(jitter < period);
        let schedule = Schedule::new(period, jitter).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..16 {
            let gap = schedule.next_gap(&mut rng);
            prop_assert!(gap >= period - jitter);
            if jitter.is_zero() {
                prop_assert_eq!(gap, period);
            } else {
                prop_assert!(gap < period + jitter);
            }
        }
    }
}

#[test]
fn queue_holds_a_single_pending_trigger() {
    let (trigger, mut rx) = trigger_queue();

    assert!(trigger.request(TriggerSource::Manual));
    assert!(!trigger.request(TriggerSource::Manual));
    assert!(!trigger.clone().request(TriggerSource::Timer));

    assert_eq!(rx.try_recv().unwrap(), TriggerSource::Manual);
    assert!(rx.try_recv().is_err());
    assert!(trigger.request(TriggerSource::Timer));
}

#[test]
fn closed_queue_drops_triggers() {
    let (trigger, rx) = trigger_queue();
    drop(rx);
    assert!(!trigger.request(TriggerSource::Manual));
}

#[tokio::test(start_paused = true)]
async fn first_run_fires_immediately() {
    let pipeline = FakePipeline::new();
    let (coordinator, state) = coordinator(&pipeline);

    let scheduler = Scheduler::start(coordinator, Schedule::new(HOUR, Duration::ZERO).unwrap());
    advance(1).await;

    assert_eq!(pipeline.executions(), 1);
    assert!(state.snapshot().last_run_success);
    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn burst_of_triggers_during_a_run_queues_one_more() {
    let pipeline = FakePipeline::new();
    pipeline.set_delay(Duration::from_secs(10));
    let (coordinator, state) = coordinator(&pipeline);
    let scheduler = Scheduler::start(coordinator, Schedule::new(HOUR, Duration::ZERO).unwrap());

    advance(1).await;
    assert!(state.is_running());
    let trigger = scheduler.trigger();
    let accepted = (0..50).filter(|_| trigger.request(TriggerSource::Manual)).count();
    assert_eq!(accepted, 1);

    advance(60).await;
    assert_eq!(pipeline.executions(), 2);
    assert!(!state.is_running());
    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_triggers_from_many_tasks_coalesce() {
    let pipeline = FakePipeline::new();
    pipeline.set_delay(Duration::from_secs(10));
    let (coordinator, _) = coordinator(&pipeline);
    let scheduler = Scheduler::start(coordinator, Schedule::new(HOUR, Duration::ZERO).unwrap());
    advance(1).await;

    let requests: Vec<_> = (0..20)
        .map(|_| {
            let trigger = scheduler.trigger();
            tokio::spawn(async move { trigger.request(TriggerSource::Manual) })
        })
        .collect();
    for request in requests {
        request.await.unwrap();
    }

    advance(100).await;
    assert_eq!(pipeline.executions(), 2);
    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unjittered_runs_are_one_period_apart() {
    let pipeline = FakePipeline::new();
    let (coordinator, _) = coordinator(&pipeline);
    let scheduler = Scheduler::start(coordinator, Schedule::new(Duration::from_secs(60), Duration::ZERO).unwrap());

    advance(59).await;
    assert_eq!(pipeline.executions(), 1);
    advance(2).await;
    assert_eq!(pipeline.executions(), 2);
    advance(58).await;
    assert_eq!(pipeline.executions(), 2);
    advance(2).await;
    assert_eq!(pipeline.executions(), 3);
    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn jittered_runs_fall_inside_the_window() {
    let pipeline = FakePipeline::new();
    let (coordinator, _) = coordinator(&pipeline);
    let scheduler =
        Scheduler::start(coordinator, Schedule::new(Duration::from_secs(60), Duration::from_secs(10)).unwrap());

    advance(49).await;
    assert_eq!(pipeline.executions(), 1);
    advance(22).await;
    assert_eq!(pipeline.executions(), 2);
    scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_lets_the_current_run_finish() {
    let pipeline = FakePipeline::new();
    pipeline.set_delay(Duration::from_secs(30));
    let (coordinator, state) = coordinator(&pipeline);
    let scheduler = Scheduler::start(coordinator, Schedule::new(HOUR, Duration::ZERO).unwrap());
    advance(1).await;
    scheduler.trigger().request(TriggerSource::Manual);

    scheduler.shutdown().await;

    assert_eq!(pipeline.executions(), 1);
    assert!(!state.is_running());
    assert!(state.snapshot().last_run_success);
}

#[tokio::test(start_paused = true)]
async fn executor_stops_when_triggers_are_dropped() {
    let pipeline = FakePipeline::new();
    let (coordinator, _) = coordinator(&pipeline);
    let (trigger, rx) = trigger_queue();
    trigger.request(TriggerSource::Manual);
    drop(trigger);

    run_executor(coordinator, rx, CancellationToken::new()).await;

    assert_eq!(pipeline.executions(), 1);
}
