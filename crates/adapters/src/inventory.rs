// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resolving which inventory entry names this host.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ap_core::{CommandError, CommandSpec, ErrorKind};
use ap_shell::CommandExecutor;
use thiserror::Error;

const LIST_HOSTS: &str = "--list-hosts";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("inventory {} does not exist", path.display())]
    MissingInventory { path: PathBuf },

    #[error("cannot list hosts of inventory {}: {source}", inventory.display())]
    ListHosts { inventory: PathBuf, source: CommandError },

    #[error("none of [{}] appear in any inventory", candidates.join(", "))]
    NotFound { candidates: Vec<String> },
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::ListHosts { .. } => ErrorKind::Execution,
            ResolveError::MissingInventory { .. } | ResolveError::NotFound { .. } => ErrorKind::Resolution,
        }
    }
}

/// The inventory and host the configuration tool should target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryMatch {
    /// As configured, relative to the tool's working directory.
    pub inventory: PathBuf,
    pub target: String,
}

/// Lists inventory hosts with `ansible-playbook --list-hosts`.
#[derive(Debug, Clone)]
pub struct InventoryResolver {
    executor: CommandExecutor,
    working_dir: PathBuf,
    playbook: String,
    bin_dir: Option<PathBuf>,
}

impl InventoryResolver {
    pub fn new(executor: CommandExecutor, working_dir: impl Into<PathBuf>, playbook: impl Into<String>) -> Self {
        Self { executor, working_dir: working_dir.into(), playbook: playbook.into(), bin_dir: None }
    }

    /// Resolve the tool binary under `dir` (the environment's bin directory).
    pub fn bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    /// First `(inventory, candidate)` where the candidate is exactly a listed host.
    ///
    /// Inventories are scanned in order and candidates in order within each.
    pub async fn resolve(
        &self,
        inventories: &[PathBuf],
        candidates: &[String],
    ) -> Result<InventoryMatch, ResolveError> {
        for inventory in inventories {
            let path = self.working_dir.join(inventory);
            if !path.exists() {
                return Err(ResolveError::MissingInventory { path });
            }

            let listing = self.list_hosts(inventory).await?;
            if let Some(target) = find_match(&listing, candidates) {
                tracing::info!(inventory = %inventory.display(), %target, "resolved inventory target");
                return Ok(InventoryMatch { inventory: inventory.clone(), target: target.to_string() });
            }
            tracing::debug!(inventory = %inventory.display(), "no candidate listed");
        }
        Err(ResolveError::NotFound { candidates: candidates.to_vec() })
    }

    async fn list_hosts(&self, inventory: &Path) -> Result<String, ResolveError> {
        let mut spec = CommandSpec::new("ansible-playbook")
            .arg(self.playbook.as_str())
            .arg("-i")
            .arg(inventory.to_string_lossy())
            .arg(LIST_HOSTS)
            .working_dir(self.working_dir.clone());
        if let Some(dir) = &self.bin_dir {
            spec = spec.bin_dir(dir.clone());
        }
        self.executor
            .run(&spec)
            .await
            .into_result()
            .map(|result| result.stdout)
            .map_err(|source| ResolveError::ListHosts { inventory: inventory.to_path_buf(), source })
    }
}

/// First candidate equal to some trimmed line of `listing`.
pub(crate) fn find_match<'a>(listing: &str, candidates: &'a [String]) -> Option<&'a str> {
    let hosts: HashSet<&str> = listing.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    candidates.iter().map(String::as_str).find(|c| hosts.contains(c))
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod tests;
