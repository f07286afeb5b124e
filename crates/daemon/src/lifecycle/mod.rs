// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, serving, shutdown, and single-run mode.

mod startup;
pub use startup::{run_once, startup};

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use ap_adapters::IdentityError;
use ap_core::{ErrorKind, RunStateHandle};
use ap_engine::Scheduler;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::listener::{self, ListenCtx};
use crate::logging::LoggingError;
use crate::metrics::{MetricsError, PullerMetrics};

/// Reason recorded when `--start-disabled` is set.
pub const STARTUP_DISABLE_REASON: &str = "disabled at startup";

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cannot determine local identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("local hostname is empty")]
    EmptyHostname,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("metrics setup failed: {0}")]
    Metrics(#[from] MetricsError),

    #[error("failed to bind control surface on {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("control surface failed: {0}")]
    Serve(io::Error),

    #[error("failed to install signal handler: {0}")]
    Signal(io::Error),

    #[error("run failed ({0})")]
    RunFailed(ErrorKind),
}

/// A started daemon: scheduler running, control port bound.
pub struct Daemon {
    pub config: Config,
    pub hostname: String,
    pub state: RunStateHandle,
    pub metrics: Arc<PullerMetrics>,
    scheduler: Scheduler,
    listener: TcpListener,
}

impl Daemon {
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve the control surface until `shutdown` resolves.
    ///
    /// Stops the HTTP server gracefully, stops the timer, and waits for the
    /// in-flight run (if any) to finish.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), LifecycleError> {
        let cancel = CancellationToken::new();
        let ctx = ListenCtx {
            state: self.state.clone(),
            trigger: self.scheduler.trigger(),
            metrics: Arc::clone(&self.metrics),
            hostname: Arc::from(self.hostname.as_str()),
        };
        let mut server = tokio::spawn(listener::serve(self.listener, ctx, cancel.clone()));

        let served = tokio::select! {
            () = shutdown => {
                info!("shutting down");
                cancel.cancel();
                (&mut server).await
            }
            served = &mut server => served,
        };

        self.scheduler.shutdown().await;
        info!("daemon stopped");

        match served {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(LifecycleError::Serve(e)),
            Err(e) => {
                warn!(error = %e, "control surface task ended abnormally");
                Err(LifecycleError::Serve(io::Error::other(e)))
            }
        }
    }
}

/// SIGINT and SIGTERM handlers, installed before startup.
pub struct Signals {
    interrupt: Signal,
    terminate: Signal,
}

impl Signals {
    pub fn install() -> Result<Self, LifecycleError> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(LifecycleError::Signal)?,
            terminate: signal(SignalKind::terminate()).map_err(LifecycleError::Signal)?,
        })
    }

    pub async fn wait(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => info!("received SIGINT"),
            _ = self.terminate.recv() => info!("received SIGTERM"),
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
