// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Virtualenv provisioning for the configuration tool.

use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use ap_core::{CommandError, CommandSpec, EnvironmentSpec, ErrorKind};
use ap_shell::CommandExecutor;
use thiserror::Error;

/// First interpreter release with a built-in `venv` module.
const BUILTIN_VENV_SINCE: (u32, u32) = (3, 3);

const VIRTUALENV: &str = "virtualenv";

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("cannot determine interpreter version: {0}")]
    VersionProbe(CommandError),

    #[error("unrecognised interpreter version output `{0}`")]
    VersionFormat(String),

    #[error("`{VIRTUALENV}` not found on PATH (needed for Python {major}.{minor})")]
    ToolMissing { major: u32, minor: u32 },

    #[error("cannot create environment at {}: {source}", path.display())]
    Create { path: PathBuf, source: CommandError },

    #[error("cannot update environment: {0}")]
    Update(CommandError),
}

impl ProvisionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Provision
    }
}

/// Creates and updates virtualenvs through the command executor.
#[derive(Debug, Clone)]
pub struct EnvironmentProvisioner {
    executor: CommandExecutor,
    search_path: Option<OsString>,
}

impl EnvironmentProvisioner {
    pub fn new(executor: CommandExecutor) -> Self {
        Self { executor, search_path: None }
    }

    /// Search these directories for `virtualenv` instead of `$PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Create the environment unless its root already exists.
    ///
    /// Returns true when an environment was created.
    pub async fn ensure(&self, spec: &EnvironmentSpec) -> Result<bool, ProvisionError> {
        if spec.exists() {
            tracing::debug!(path = %spec.root.display(), "environment present");
            return Ok(false);
        }

        let version = self.interpreter_version(&spec.interpreter).await?;
        tracing::debug!(major = version.0, minor = version.1, "detected interpreter version");

        let interpreter = spec.interpreter.to_string_lossy().into_owned();
        let root = spec.root.to_string_lossy().into_owned();
        let create = if version >= BUILTIN_VENV_SINCE {
            CommandSpec::new(interpreter).args(["-m", "venv", root.as_str()])
        } else {
            let tool = self.find_tool(VIRTUALENV).ok_or(ProvisionError::ToolMissing {
                major: version.0,
                minor: version.1,
            })?;
            CommandSpec::new(tool.to_string_lossy()).args(["--python", interpreter.as_str(), root.as_str()])
        };

        tracing::info!(path = %spec.root.display(), "creating environment");
        let result = self.executor.run(&create).await;
        if let Some(source) = result.error {
            tracing::debug!(stdout = %result.stdout, stderr = %result.stderr, "environment creation failed");
            return Err(ProvisionError::Create { path: spec.root.clone(), source });
        }
        Ok(true)
    }

    /// Install or upgrade packages from `requirements` inside the environment.
    pub async fn update(&self, spec: &EnvironmentSpec, requirements: &Path) -> Result<(), ProvisionError> {
        let install = CommandSpec::new("pip")
            .args(["install", "-r"])
            .arg(requirements.to_string_lossy())
            .bin_dir(spec.bin_dir());
        let result = self.executor.run(&install).await;
        if let Some(source) = result.error {
            tracing::debug!(stdout = %result.stdout, stderr = %result.stderr, "pip install failed");
            return Err(ProvisionError::Update(source));
        }
        tracing::debug!(requirements = %requirements.display(), "environment updated");
        Ok(())
    }

    async fn interpreter_version(&self, interpreter: &Path) -> Result<(u32, u32), ProvisionError> {
        let probe = CommandSpec::new(interpreter.to_string_lossy()).arg("--version");
        let result = self.executor.run(&probe).await;
        if let Some(e) = result.error {
            return Err(ProvisionError::VersionProbe(e));
        }
        // Older interpreters print the version on stderr.
        let output = format!("{}{}", result.stdout, result.stderr);
        parse_python_version(&output).ok_or_else(|| ProvisionError::VersionFormat(output.trim().to_string()))
    }

    fn find_tool(&self, name: &str) -> Option<PathBuf> {
        let path = self.search_path.clone().or_else(|| std::env::var_os("PATH"))?;
        std::env::split_paths(&path).map(|dir| dir.join(name)).find(|p| is_executable(p))
    }
}

fn is_executable(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0).unwrap_or(false)
}

/// `(major, minor)` from `Python X.Y[.Z...]`.
pub(crate) fn parse_python_version(output: &str) -> Option<(u32, u32)> {
    let mut fields = output.split_whitespace();
    if fields.next()? != "Python" {
        return None;
    }
    let mut parts = fields.next()?.split('.');
    let major = leading_number(parts.next()?)?;
    let minor = leading_number(parts.next()?)?;
    Some((major, minor))
}

fn leading_number(s: &str) -> Option<u32> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

#[cfg(test)]
#[path = "venv_tests.rs"]
mod tests;
