// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity of one isolated interpreter environment (a virtualenv).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A virtualenv rooted at `root`, created from `interpreter`.
///
/// Existence is keyed on `root` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub root: PathBuf,
    pub interpreter: PathBuf,
}

impl EnvironmentSpec {
    pub fn new(root: impl Into<PathBuf>, interpreter: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), interpreter: interpreter.into() }
    }

    /// Directory holding the environment's executables.
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
