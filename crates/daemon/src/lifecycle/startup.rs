// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wiring the run pipeline, scheduler, and control surface together.

use std::sync::Arc;

use ap_adapters::local_candidates;
use ap_core::{RunState, RunWriter};
use ap_engine::{NoopTelemetry, RunCoordinator, RunOutcome, RunPipeline, RunTelemetry, Scheduler};
use ap_shell::CommandExecutor;
use tokio::net::TcpListener;
use tracing::info;

use super::{Daemon, LifecycleError, STARTUP_DISABLE_REASON};
use crate::config::Config;
use crate::env::{self, VERSION};
use crate::metrics::PullerMetrics;

/// Start the daemon
///
/// Binding the control port happens before the scheduler starts, so a bind
/// failure never leaves a run in flight.
pub async fn startup(config: Config) -> Result<Daemon, LifecycleError> {
    let hostname = env::hostname()?;
    let metrics = Arc::new(PullerMetrics::new(VERSION, config.debug)?);

    let disabled = config.start_disabled.then(|| STARTUP_DISABLE_REASON.to_string());
    metrics.set_disabled(disabled.is_some());
    let (state, writer) = RunState::shared(disabled);

    let telemetry: Arc<dyn RunTelemetry> = metrics.clone();
    let coordinator = coordinator(&config, &hostname, writer, telemetry)?;

    let listener = TcpListener::bind(&config.listen)
        .await
        .map_err(|source| LifecycleError::Bind { addr: config.listen.clone(), source })?;

    let scheduler = Scheduler::start(coordinator, config.schedule);
    info!(
        %hostname,
        locator = %config.source.locator(),
        disabled = config.start_disabled,
        debug = config.debug,
        "ansible-puller started"
    );

    Ok(Daemon { config, hostname, state, metrics, scheduler, listener })
}

/// Run the pipeline once without the scheduler or control surface.
pub async fn run_once(config: &Config) -> Result<RunOutcome, LifecycleError> {
    let hostname = env::hostname()?;
    let (_state, writer) = RunState::shared(None);
    let mut coordinator = coordinator(config, &hostname, writer, Arc::new(NoopTelemetry))?;
    info!(%hostname, locator = %config.source.locator(), "single run");
    Ok(coordinator.run_once().await)
}

fn coordinator(
    config: &Config,
    hostname: &str,
    writer: RunWriter,
    telemetry: Arc<dyn RunTelemetry>,
) -> Result<RunCoordinator, LifecycleError> {
    let candidates = local_candidates(hostname)?;
    let pipeline = RunPipeline::new(
        config.pipeline(candidates),
        config.source.downloader(),
        CommandExecutor::new(),
        Arc::clone(&telemetry),
    );
    Ok(RunCoordinator::new(Arc::new(pipeline), writer, telemetry))
}
