// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pull-and-apply pipeline: fetch, extract, provision, resolve, execute.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ap_adapters::{extract, fetch, Downloader, EnvironmentProvisioner, InventoryResolver};
use ap_core::{CommandResult, EnvironmentSpec, DEFAULT_COMMAND_DEADLINE};
use ap_shell::CommandExecutor;
use async_trait::async_trait;
use tempfile::TempDir;

use crate::error::RunError;
use crate::playbook::PlaybookRunner;
use crate::telemetry::RunTelemetry;

pub const OUTPUT_LOG: &str = "ansible-run-output.log";
pub const ERROR_LOG: &str = "ansible-run-error.log";
const LOG_MODE: u32 = 0o600;
const RUN_DIR_PREFIX: &str = "ansible-puller";

/// One execution of the run stages.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn execute(&self) -> Result<(), RunError>;
}

/// Everything a run needs, fixed at startup.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub locator: String,
    /// Overrides `<locator>.md5`.
    pub checksum_locator: Option<String>,
    pub cache_file: PathBuf,
    pub log_dir: PathBuf,
    /// Tool working directory, relative to the extracted bundle.
    pub ansible_dir: PathBuf,
    pub playbook: String,
    /// Relative to `ansible_dir`.
    pub inventories: Vec<PathBuf>,
    pub stream_output: bool,
    pub environment: EnvironmentSpec,
    /// Relative to the extracted bundle.
    pub requirements: PathBuf,
    pub candidates: Vec<String>,
    /// Keep each run's extraction directory instead of removing it.
    pub keep_run_dirs: bool,
    pub command_deadline: Duration,
}

impl PipelineConfig {
    pub fn new(locator: impl Into<String>, environment: EnvironmentSpec) -> Self {
        Self {
            locator: locator.into(),
            checksum_locator: None,
            cache_file: PathBuf::from("/tmp/ansible-puller.tgz"),
            log_dir: PathBuf::from("/var/log/ansible-puller"),
            ansible_dir: PathBuf::new(),
            playbook: "site.yml".to_string(),
            inventories: Vec::new(),
            stream_output: false,
            environment,
            requirements: PathBuf::from("requirements.txt"),
            candidates: Vec::new(),
            keep_run_dirs: false,
            command_deadline: DEFAULT_COMMAND_DEADLINE,
        }
    }
}

/// Extraction directory for one run.
enum RunDir {
    Scoped(TempDir),
    Kept(PathBuf),
}

impl RunDir {
    fn create(keep: bool) -> Result<Self, RunError> {
        let dir = tempfile::Builder::new().prefix(RUN_DIR_PREFIX).tempdir().map_err(RunError::RunDir)?;
        if keep {
            let path = dir.keep();
            tracing::info!(path = %path.display(), "keeping run directory");
            return Ok(RunDir::Kept(path));
        }
        Ok(RunDir::Scoped(dir))
    }

    fn path(&self) -> &Path {
        match self {
            RunDir::Scoped(dir) => dir.path(),
            RunDir::Kept(path) => path,
        }
    }
}

/// The production pipeline.
pub struct RunPipeline {
    config: PipelineConfig,
    downloader: Arc<dyn Downloader>,
    executor: CommandExecutor,
    provisioner: EnvironmentProvisioner,
    telemetry: Arc<dyn RunTelemetry>,
}

impl RunPipeline {
    pub fn new(
        config: PipelineConfig,
        downloader: Arc<dyn Downloader>,
        executor: CommandExecutor,
        telemetry: Arc<dyn RunTelemetry>,
    ) -> Self {
        let provisioner = EnvironmentProvisioner::new(executor.clone());
        Self { config, downloader, executor, provisioner, telemetry }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    async fn unpack(&self) -> Result<RunDir, RunError> {
        let run_dir = RunDir::create(self.config.keep_run_dirs)?;
        let archive = self.config.cache_file.clone();
        let dest = run_dir.path().to_path_buf();
        let summary = tokio::task::spawn_blocking(move || extract(&archive, &dest))
            .await
            .map_err(|e| RunError::ExtractTask(e.to_string()))??;
        tracing::debug!(files = summary.files, directories = summary.directories, "bundle unpacked");
        Ok(run_dir)
    }

    fn persist_logs(&self, result: &CommandResult) {
        let logs = [(OUTPUT_LOG, &result.stdout), (ERROR_LOG, &result.stderr)];
        for (name, contents) in logs {
            let path = self.config.log_dir.join(name);
            if let Err(e) = write_log(&path, contents) {
                tracing::error!(path = %path.display(), error = %e, "unable to write run log");
            }
        }
    }
}

#[async_trait]
impl Pipeline for RunPipeline {
    async fn execute(&self) -> Result<(), RunError> {
        let config = &self.config;

        tracing::info!(locator = %config.locator, "pulling bundle");
        let outcome =
            fetch(self.downloader.as_ref(), &config.locator, config.checksum_locator.as_deref(), &config.cache_file)
                .await?;
        tracing::debug!(?outcome, "bundle fetched");

        let run_dir = self.unpack().await?;

        tracing::info!("ensuring environment exists");
        self.provisioner.ensure(&config.environment).await?;
        tracing::info!("updating environment");
        self.provisioner.update(&config.environment, &run_dir.path().join(&config.requirements)).await?;

        let workdir = run_dir.path().join(&config.ansible_dir);
        let bin_dir = config.environment.bin_dir();

        tracing::info!("finding inventory for this host");
        let found = InventoryResolver::new(self.executor.clone(), &workdir, config.playbook.as_str())
            .bin_dir(&bin_dir)
            .resolve(&config.inventories, &config.candidates)
            .await?;

        let run = PlaybookRunner::new(self.executor.clone(), &workdir, config.playbook.as_str())
            .bin_dir(bin_dir)
            .stream_output(config.stream_output)
            .deadline(config.command_deadline)
            .run(&found)
            .await;

        if let Ok(recap) = &run.recap {
            let stats = recap.host(&found.target).copied().unwrap_or_default();
            self.telemetry.play_summary(&found.target, &stats);
        }

        tracing::info!(dir = %config.log_dir.display(), "writing playbook output to log files");
        self.persist_logs(&run.result);

        if let Some(e) = run.result.error {
            return Err(RunError::Playbook(e));
        }
        run.recap?;
        Ok(())
    }
}

/// Overwrite `path` with `contents`, creating it owner-only.
fn write_log(path: &Path, contents: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create(true).truncate(true).mode(LOG_MODE).open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
