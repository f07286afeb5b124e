// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide `PATH` augmentation.
//!
//! Tools launched from a virtualenv spawn sibling executables by name, so the
//! environment's `bin` directory must be on the daemon's own `PATH`. This is
//! a global mutation read by every later subprocess launch. It is serialised
//! through a lock and skipped when the directory is already present, so a
//! directory is prepended at most once per process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

static PATH_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Prepend `dir` to `PATH` unless it is already listed.
///
/// Returns true when `PATH` was changed.
pub fn ensure_on_path(dir: &Path) -> bool {
    let _guard = PATH_LOCK.lock();
    let current = std::env::var_os("PATH").unwrap_or_default();
    let entries: Vec<PathBuf> = std::env::split_paths(&current).collect();
    if entries.iter().any(|p| p == dir) {
        return false;
    }

    let joined = match prepend(dir, &entries) {
        Ok(joined) => joined,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot add directory to PATH");
            return false;
        }
    };
    std::env::set_var("PATH", &joined);
    tracing::debug!(dir = %dir.display(), "added directory to PATH");
    true
}

fn prepend(dir: &Path, entries: &[PathBuf]) -> Result<OsString, std::env::JoinPathsError> {
    std::env::join_paths(std::iter::once(dir).chain(entries.iter().map(PathBuf::as_path)))
}

#[cfg(test)]
#[path = "path_tests.rs"]
mod tests;
