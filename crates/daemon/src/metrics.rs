// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prometheus metrics served on `/metrics`.
//!
//! | Metric | Type |
//! |--------|------|
//! | `ansible_puller_running` | gauge |
//! | `ansible_puller_runs` | counter |
//! | `ansible_puller_run_time_seconds` | gauge |
//! | `ansible_puller_disabled` | gauge |
//! | `ansible_puller_last_success` | gauge (epoch seconds) |
//! | `ansible_puller_play_summary{status}` | gauge |
//! | `ansible_puller_version{version}` | gauge |
//! | `ansible_puller_debug` | gauge |

use std::time::Duration;

use ap_core::HostStats;
use ap_engine::RunTelemetry;
use prometheus::{Encoder, Gauge, GaugeVec, IntCounter, Opts, Registry, TextEncoder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to register metric: {0}")]
    Register(#[from] prometheus::Error),

    #[error("failed to encode metrics: {0}")]
    Encode(String),
}

/// Registry plus handles to every puller metric.
#[derive(Clone)]
pub struct PullerMetrics {
    registry: Registry,
    running: Gauge,
    runs: IntCounter,
    run_time: Gauge,
    disabled: Gauge,
    last_success: Gauge,
    play_summary: GaugeVec,
}

impl PullerMetrics {
    pub fn new(version: &str, debug: bool) -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let running = Gauge::with_opts(Opts::new("ansible_puller_running", "1 while a run is in flight"))?;
        registry.register(Box::new(running.clone()))?;

        let runs = IntCounter::with_opts(Opts::new("ansible_puller_runs", "Runs attempted"))?;
        registry.register(Box::new(runs.clone()))?;

        let run_time =
            Gauge::with_opts(Opts::new("ansible_puller_run_time_seconds", "Duration of the last run in seconds"))?;
        registry.register(Box::new(run_time.clone()))?;

        let disabled = Gauge::with_opts(Opts::new("ansible_puller_disabled", "1 while runs are disabled"))?;
        registry.register(Box::new(disabled.clone()))?;

        let last_success = Gauge::with_opts(Opts::new(
            "ansible_puller_last_success",
            "UTC epoch seconds of the last successful run",
        ))?;
        registry.register(Box::new(last_success.clone()))?;

        let play_summary = GaugeVec::new(
            Opts::new("ansible_puller_play_summary", "Task counts for this host in the last play"),
            &["status"],
        )?;
        registry.register(Box::new(play_summary.clone()))?;

        let version_info =
            GaugeVec::new(Opts::new("ansible_puller_version", "Running ansible-puller version"), &["version"])?;
        registry.register(Box::new(version_info.clone()))?;
        version_info.with_label_values(&[version]).set(1.0);

        let debug_mode = Gauge::with_opts(Opts::new("ansible_puller_debug", "1 in debug mode"))?;
        registry.register(Box::new(debug_mode.clone()))?;
        debug_mode.set(if debug { 1.0 } else { 0.0 });

        Ok(Self { registry, running, runs, run_time, disabled, last_success, play_summary })
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.set(if disabled { 1.0 } else { 0.0 });
    }

    /// Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| MetricsError::Encode(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| MetricsError::Encode(e.to_string()))
    }
}

impl RunTelemetry for PullerMetrics {
    fn run_started(&self) {
        self.running.set(1.0);
        self.runs.inc();
    }

    fn play_summary(&self, target: &str, stats: &HostStats) {
        tracing::debug!(target_host = %target, ?stats, "play summary");
        for (status, count) in stats.summary() {
            self.play_summary.with_label_values(&[status]).set(count as f64);
        }
    }

    fn run_finished(&self, success: bool, elapsed: Duration) {
        self.running.set(0.0);
        self.run_time.set(elapsed.as_secs_f64());
        if success {
            self.last_success.set(chrono::Utc::now().timestamp() as f64);
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
