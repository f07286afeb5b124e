// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide run state shared between the executor and the control surface.
//!
//! The state is split into two capabilities over one lock:
//! - [`RunStateHandle`] (cloneable) reads snapshots and toggles `disabled`.
//! - [`RunWriter`] (unique) is the only way to change `running` and
//!   `last_run_success`. Exactly one exists per state.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

/// Point-in-time view of the run state.
///
/// A fresh state reports the last run as successful: no run has failed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunState {
    pub disabled: bool,
    pub disable_reason: String,
    pub running: bool,
    pub last_run_success: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self { disabled: false, disable_reason: String::new(), running: false, last_run_success: true }
    }
}

impl RunState {
    /// Create shared state, optionally starting disabled with a reason.
    pub fn shared(disabled: Option<String>) -> (RunStateHandle, RunWriter) {
        let state = RunState {
            disabled: disabled.is_some(),
            disable_reason: disabled.unwrap_or_default(),
            ..Default::default()
        };
        let inner = Arc::new(RwLock::new(state));
        (RunStateHandle { inner: Arc::clone(&inner) }, RunWriter { inner })
    }
}

/// Shared read access plus the enable/disable control.
#[derive(Debug, Clone)]
pub struct RunStateHandle {
    inner: Arc<RwLock<RunState>>,
}

impl RunStateHandle {
    pub fn snapshot(&self) -> RunState {
        self.inner.read().clone()
    }

    pub fn is_disabled(&self) -> bool {
        self.inner.read().disabled
    }

    pub fn is_running(&self) -> bool {
        self.inner.read().running
    }

    pub fn disable(&self, reason: impl Into<String>) {
        let mut state = self.inner.write();
        state.disabled = true;
        state.disable_reason = reason.into();
    }

    pub fn enable(&self) {
        let mut state = self.inner.write();
        state.disabled = false;
        state.disable_reason.clear();
    }
}

/// Unique writer of `running` and `last_run_success`.
#[derive(Debug)]
pub struct RunWriter {
    inner: Arc<RwLock<RunState>>,
}

impl RunWriter {
    pub fn handle(&self) -> RunStateHandle {
        RunStateHandle { inner: Arc::clone(&self.inner) }
    }

    /// Mark a run in flight.
    ///
    /// The returned guard clears `running` when dropped. A guard dropped
    /// without [`RunGuard::finish`] records the run as failed.
    pub fn begin(&mut self) -> RunGuard<'_> {
        self.inner.write().running = true;
        RunGuard { inner: &self.inner, finished: false }
    }
}

/// An in-flight run.
#[derive(Debug)]
pub struct RunGuard<'a> {
    inner: &'a RwLock<RunState>,
    finished: bool,
}

impl RunGuard<'_> {
    pub fn finish(mut self, success: bool) {
        let mut state = self.inner.write();
        state.running = false;
        state.last_run_success = success;
        self.finished = true;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut state = self.inner.write();
            state.running = false;
            state.last_run_success = false;
        }
    }
}

#[cfg(test)]
#[path = "run_state_tests.rs"]
mod tests;
