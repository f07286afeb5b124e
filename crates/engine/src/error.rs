// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregate error for one pipeline run.

use std::io;

use ap_adapters::{ExtractError, FetchError, ProvisionError, ResolveError};
use ap_core::{CommandError, ErrorKind, RecapError};
use thiserror::Error;

/// First failing stage of a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("unable to pull bundle: {0}")]
    Fetch(#[from] FetchError),

    #[error("cannot create run directory: {0}")]
    RunDir(io::Error),

    #[error("unable to extract bundle: {0}")]
    Extract(#[from] ExtractError),

    #[error("extraction task failed: {0}")]
    ExtractTask(String),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("playbook failed: {0}")]
    Playbook(CommandError),

    #[error("cannot read play recap: {0}")]
    Recap(#[from] RecapError),
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::Fetch(e) => e.kind(),
            RunError::Extract(e) => e.kind(),
            RunError::RunDir(_) | RunError::ExtractTask(_) => ErrorKind::Extraction,
            RunError::Provision(e) => e.kind(),
            RunError::Resolve(e) => e.kind(),
            RunError::Playbook(_) | RunError::Recap(_) => ErrorKind::Execution,
        }
    }
}
