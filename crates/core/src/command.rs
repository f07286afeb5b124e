// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External command descriptions and their captured outcomes.

use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on any single external command.
pub const DEFAULT_COMMAND_DEADLINE: Duration = Duration::from_secs(2 * 60 * 60);

/// Exit code reported when the process never started or was killed on deadline.
pub const NO_EXIT_CODE: i32 = -1;

/// What to run, where, and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub binary: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub deadline: Duration,
    /// Relay output lines live while still capturing them.
    pub stream_output: bool,
    /// Directory the binary is resolved under; also prepended to `PATH`.
    pub bin_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            working_dir: None,
            env: Vec::new(),
            deadline: DEFAULT_COMMAND_DEADLINE,
            stream_output: false,
            bin_dir: None,
        }
    }

    crate::setters! {
        set { deadline: std::time::Duration, stream_output: bool }
        option { working_dir: PathBuf, bin_dir: PathBuf }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// The path actually executed: `bin_dir/binary` when a bin dir is set.
    pub fn program(&self) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(&self.binary),
            None => PathBuf::from(&self.binary),
        }
    }

    /// `binary arg1 arg2` for log lines.
    pub fn display_line(&self) -> String {
        std::iter::once(self.binary.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Which output stream a relayed line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

crate::simple_display! {
    StreamKind {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// Classified command failure.
///
/// Start, exit and deadline failures are kept apart so callers can tell a
/// missing binary from a failing one from a hung one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("failed to start `{binary}`: {message}")]
    Start { binary: String, message: String },

    #[error("`{binary}` exited with code {code}")]
    Exit { binary: String, code: i32 },

    #[error("`{binary}` exceeded its deadline of {deadline:?}")]
    DeadlineExceeded { binary: String, deadline: Duration },

    #[error("failed waiting on `{binary}`: {message}")]
    Wait { binary: String, message: String },
}

impl CommandError {
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, CommandError::DeadlineExceeded { .. })
    }
}

/// Everything captured from one command execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub error: Option<CommandError>,
}

impl CommandResult {
    /// Result for a process that could not be launched.
    pub fn not_started(error: CommandError) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            exit_code: NO_EXIT_CODE,
            error: Some(error),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result`, keeping the captured output on success.
    pub fn into_result(self) -> Result<Self, CommandError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
