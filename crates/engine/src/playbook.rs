// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Invoking the configuration tool against the resolved target.

use std::path::PathBuf;
use std::time::Duration;

use ap_adapters::InventoryMatch;
use ap_core::{CommandResult, CommandSpec, PlayRecap, RecapError, DEFAULT_COMMAND_DEADLINE};
use ap_shell::CommandExecutor;

/// Environment that makes the tool print a JSON recap on stdout.
const JSON_CALLBACK_ENV: [(&str, &str); 3] = [
    ("ANSIBLE_STDOUT_CALLBACK", "json"),
    ("ANSIBLE_CALLBACK_WHITELIST", ""),
    ("ANSIBLE_CALLBACKS_ENABLED", ""),
];

/// Captured output of a playbook run and its parsed recap.
#[derive(Debug)]
pub struct PlaybookRun {
    pub result: CommandResult,
    pub recap: Result<PlayRecap, RecapError>,
}

/// Runs `ansible-playbook` with a local connection.
#[derive(Debug, Clone)]
pub struct PlaybookRunner {
    executor: CommandExecutor,
    working_dir: PathBuf,
    playbook: String,
    bin_dir: Option<PathBuf>,
    stream_output: bool,
    deadline: Duration,
}

impl PlaybookRunner {
    pub fn new(executor: CommandExecutor, working_dir: impl Into<PathBuf>, playbook: impl Into<String>) -> Self {
        Self {
            executor,
            working_dir: working_dir.into(),
            playbook: playbook.into(),
            bin_dir: None,
            stream_output: false,
            deadline: DEFAULT_COMMAND_DEADLINE,
        }
    }

    ap_core::setters! {
        set { stream_output: bool, deadline: Duration }
        option { bin_dir: PathBuf }
    }

    pub fn command(&self, target: &InventoryMatch) -> CommandSpec {
        let mut spec = CommandSpec::new("ansible-playbook")
            .arg(self.playbook.as_str())
            .arg("-i")
            .arg(target.inventory.to_string_lossy())
            .args(["-l", target.target.as_str(), "-c", "local"])
            .working_dir(self.working_dir.clone())
            .stream_output(self.stream_output)
            .deadline(self.deadline);
        for (key, value) in JSON_CALLBACK_ENV {
            spec = spec.env(key, value);
        }
        if let Some(dir) = &self.bin_dir {
            spec = spec.bin_dir(dir.clone());
        }
        spec
    }

    /// Run the playbook. The recap is parsed whatever the exit status.
    pub async fn run(&self, target: &InventoryMatch) -> PlaybookRun {
        let spec = self.command(target);
        tracing::info!(command = %spec.display_line(), "starting playbook");
        let result = self.executor.run(&spec).await;
        let recap = PlayRecap::parse(&result.stdout);
        PlaybookRun { result, recap }
    }
}

#[cfg(test)]
#[path = "playbook_tests.rs"]
mod tests;
