// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized process environment access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

pub const APP_NAME: &str = "ansible-puller";

/// Daemon version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config file basename searched for in [`config_search_dirs`].
pub const CONFIG_FILE: &str = "ansible-puller.toml";

/// `$HOME`, falling back to the platform lookup.
pub fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from).filter(|p| !p.as_os_str().is_empty()).or_else(dirs::home_dir)
}

/// Directories searched for the config file, in priority order.
pub fn config_search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from("/etc").join(APP_NAME)];
    if let Some(home) = home_dir() {
        dirs.push(home.join(format!(".{APP_NAME}")));
    }
    dirs.push(PathBuf::from("."));
    dirs
}

/// Default virtualenv location: `~/.virtualenvs/ansible_puller`.
pub fn default_venv_path() -> PathBuf {
    home_dir().unwrap_or_else(|| PathBuf::from("/root")).join(".virtualenvs").join("ansible_puller")
}

/// Hostname for status output and inventory candidates.
///
/// Fatal at startup when it cannot be determined.
pub fn hostname() -> Result<String, LifecycleError> {
    let name = ap_adapters::local_hostname().map_err(LifecycleError::Identity)?;
    if name.is_empty() {
        return Err(LifecycleError::EmptyHostname);
    }
    Ok(name)
}
