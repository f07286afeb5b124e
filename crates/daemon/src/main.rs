// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ansible-puller: pull an Ansible bundle on a schedule and apply it locally.

use ap_daemon::env::VERSION;
use ap_daemon::{logging, run_once, startup, Args, Config, LifecycleError, Signals};
use ap_engine::RunOutcome;
use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load(Args::parse())?;
    let _log_guard = logging::init(&config).map_err(LifecycleError::from)?;
    info!(version = VERSION, config_file = ?config.config_file, "ansible-puller starting");

    if config.once {
        return match run_once(&config).await? {
            RunOutcome::Failed(kind) => Err(LifecycleError::RunFailed(kind).into()),
            RunOutcome::Succeeded | RunOutcome::Skipped => Ok(()),
        };
    }

    let signals = Signals::install()?;
    let daemon = startup(config).await?;
    daemon.run(signals.wait()).await?;
    Ok(())
}
