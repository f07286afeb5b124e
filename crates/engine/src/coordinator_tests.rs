// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::RunError;
use crate::telemetry::{FakeTelemetry, TelemetryEvent};
use ap_core::RunState;
use std::time::Duration;

fn coordinator(disabled: Option<String>) -> (RunCoordinator, FakePipeline, FakeTelemetry) {
    let pipeline = FakePipeline::new();
    let telemetry = FakeTelemetry::new();
    let (_, writer) = RunState::shared(disabled);
    let coordinator = RunCoordinator::new(Arc::new(pipeline.clone()), writer, Arc::new(telemetry.clone()));
    (coordinator, pipeline, telemetry)
}

#[tokio::test]
async fn disabled_run_has_no_side_effects() {
    let (mut coordinator, pipeline, telemetry) = coordinator(Some("maintenance".into()));
    let state = coordinator.state();

    assert_eq!(coordinator.run_once().await, RunOutcome::Skipped);

    assert_eq!(pipeline.executions(), 0);
    assert!(telemetry.events().is_empty());
    let snapshot = state.snapshot();
    assert!(!snapshot.running);
    assert!(snapshot.last_run_success);
    assert_eq!(snapshot.disable_reason, "maintenance");
}

#[tokio::test]
async fn successful_run_updates_state_and_telemetry() {
    let (mut coordinator, pipeline, telemetry) = coordinator(None);
    let state = coordinator.state();

    assert_eq!(coordinator.run_once().await, RunOutcome::Succeeded);

    assert_eq!(pipeline.executions(), 1);
    assert!(state.snapshot().last_run_success);
    assert!(!state.is_running());
    assert_eq!(telemetry.events(), vec![TelemetryEvent::Started, TelemetryEvent::Finished { success: true }]);
}

#[tokio::test]
async fn failed_run_reports_kind() {
    let (mut coordinator, pipeline, telemetry) = coordinator(None);
    pipeline.fail_with(|| RunError::ExtractTask("boom".into()));
    let state = coordinator.state();

    assert_eq!(coordinator.run_once().await, RunOutcome::Failed(ErrorKind::Extraction));

    assert!(!state.snapshot().last_run_success);
    assert_eq!(telemetry.finished(), vec![false]);
}

#[tokio::test]
async fn failure_after_success_clears_last_success() {
    let (mut coordinator, pipeline, _) = coordinator(None);
    let state = coordinator.state();

    coordinator.run_once().await;
    assert!(state.snapshot().last_run_success);

    pipeline.fail_with(|| RunError::ExtractTask("boom".into()));
    coordinator.run_once().await;
    assert!(!state.snapshot().last_run_success);
}

#[tokio::test(start_paused = true)]
async fn running_is_visible_while_in_flight() {
    let (mut coordinator, pipeline, _) = coordinator(None);
    pipeline.set_delay(Duration::from_secs(5));
    let state = coordinator.state();

    let task = tokio::spawn(async move { coordinator.run_once().await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(state.is_running());

    assert_eq!(task.await.unwrap(), RunOutcome::Succeeded);
    assert!(!state.is_running());
}

#[tokio::test]
async fn disable_between_runs_takes_effect() {
    let (mut coordinator, pipeline, _) = coordinator(None);
    let state = coordinator.state();

    coordinator.run_once().await;
    state.disable("paused");
    assert_eq!(coordinator.run_once().await, RunOutcome::Skipped);
    state.enable();
    coordinator.run_once().await;

    assert_eq!(pipeline.executions(), 2);
}
