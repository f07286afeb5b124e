// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sink for run counters and gauges.

use std::time::Duration;

use ap_core::HostStats;

/// Receives run lifecycle measurements. Implementations must not block.
pub trait RunTelemetry: Send + Sync {
    /// A run is starting (not called for disabled skips).
    fn run_started(&self);

    /// Stats the configuration tool reported for the resolved target.
    fn play_summary(&self, target: &str, stats: &HostStats);

    fn run_finished(&self, success: bool, elapsed: Duration);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl RunTelemetry for NoopTelemetry {
    fn run_started(&self) {}
    fn play_summary(&self, _target: &str, _stats: &HostStats) {}
    fn run_finished(&self, _success: bool, _elapsed: Duration) {}
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded telemetry call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TelemetryEvent {
        Started,
        Summary { target: String, stats: HostStats },
        Finished { success: bool },
    }

    /// Records telemetry calls in order.
    #[derive(Debug, Clone, Default)]
    pub struct FakeTelemetry {
        events: Arc<Mutex<Vec<TelemetryEvent>>>,
    }

    impl FakeTelemetry {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<TelemetryEvent> {
            self.events.lock().clone()
        }

        pub fn finished(&self) -> Vec<bool> {
            self.events
                .lock()
                .iter()
                .filter_map(|e| match e {
                    TelemetryEvent::Finished { success } => Some(*success),
                    _ => None,
                })
                .collect()
        }
    }

    impl RunTelemetry for FakeTelemetry {
        fn run_started(&self) {
            self.events.lock().push(TelemetryEvent::Started);
        }

        fn play_summary(&self, target: &str, stats: &HostStats) {
            self.events.lock().push(TelemetryEvent::Summary { target: target.to_string(), stats: *stats });
        }

        fn run_finished(&self, success: bool, _elapsed: Duration) {
            self.events.lock().push(TelemetryEvent::Finished { success });
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTelemetry, TelemetryEvent};
