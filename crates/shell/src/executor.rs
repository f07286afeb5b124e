// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deadline-bounded subprocess execution with optional live relay.

use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ap_core::command::NO_EXIT_CODE;
use ap_core::{CommandError, CommandResult, CommandSpec, StreamKind};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::path::ensure_on_path;
use crate::sink::{OutputSink, StdioSink};

/// How long to wait for a killed process to be reaped.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// How long to wait for readers to drain after the process is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Runs [`CommandSpec`]s. Never fails: every outcome lands in the result.
#[derive(Clone)]
pub struct CommandExecutor {
    sink: Arc<dyn OutputSink>,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CommandExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor").finish_non_exhaustive()
    }
}

impl CommandExecutor {
    /// Executor relaying streamed output to the daemon's stdio.
    pub fn new() -> Self {
        Self { sink: Arc::new(StdioSink) }
    }

    pub fn with_sink(sink: Arc<dyn OutputSink>) -> Self {
        Self { sink }
    }

    pub async fn run(&self, spec: &CommandSpec) -> CommandResult {
        if let Some(dir) = &spec.bin_dir {
            ensure_on_path(dir);
        }

        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + spec.deadline;
        let mut cmd = tokio::process::Command::new(spec.program());
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);
        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        tracing::debug!(command = %spec.display_line(), "spawning");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(binary = %spec.binary, error = %e, "failed to start command");
                return CommandResult::not_started(CommandError::Start {
                    binary: spec.binary.clone(),
                    message: e.to_string(),
                });
            }
        };

        // Saved before the child is reaped; the group outlives its leader.
        let pgid = child.id();
        let relay = spec.stream_output.then(|| Arc::clone(&self.sink));
        let mut stdout_task = spawn_reader(child.stdout.take(), StreamKind::Stdout, relay.clone());
        let mut stderr_task = spawn_reader(child.stderr.take(), StreamKind::Stderr, relay);

        // Readers are joined inside the deadline: the result is final only
        // once both streams have drained. A joined handle must not be polled
        // again, so its output is parked here.
        let mut stdout_out: Option<String> = None;
        let mut stderr_out: Option<String> = None;
        let completed = tokio::time::timeout_at(deadline, async {
            let status = child.wait().await;
            stdout_out = Some(join_reader(&mut stdout_task).await);
            stderr_out = Some(join_reader(&mut stderr_task).await);
            status
        })
        .await;

        let result = match completed {
            Ok(Ok(status)) => {
                let exit_code = status.code().unwrap_or(NO_EXIT_CODE);
                let error = (!status.success())
                    .then(|| CommandError::Exit { binary: spec.binary.clone(), code: exit_code });
                CommandResult {
                    stdout: stdout_out.unwrap_or_default(),
                    stderr: stderr_out.unwrap_or_default(),
                    exit_code,
                    error,
                }
            }
            Ok(Err(e)) => CommandResult {
                stdout: stdout_out.unwrap_or_default(),
                stderr: stderr_out.unwrap_or_default(),
                exit_code: NO_EXIT_CODE,
                error: Some(CommandError::Wait { binary: spec.binary.clone(), message: e.to_string() }),
            },
            Err(_) => {
                tracing::warn!(binary = %spec.binary, deadline = ?spec.deadline, "command deadline exceeded");
                terminate(pgid, &mut child).await;
                let stdout = match stdout_out {
                    Some(out) => out,
                    None => drain_or_abort(stdout_task).await,
                };
                let stderr = match stderr_out {
                    Some(out) => out,
                    None => drain_or_abort(stderr_task).await,
                };
                CommandResult {
                    stdout,
                    stderr,
                    exit_code: NO_EXIT_CODE,
                    error: Some(CommandError::DeadlineExceeded {
                        binary: spec.binary.clone(),
                        deadline: spec.deadline,
                    }),
                }
            }
        };

        tracing::debug!(
            binary = %spec.binary,
            exit_code = result.exit_code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "command finished"
        );
        result
    }
}

fn spawn_reader<R>(
    stream: Option<R>,
    kind: StreamKind,
    relay: Option<Arc<dyn OutputSink>>,
) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(stream) = stream else {
            return String::new();
        };
        match relay {
            Some(sink) => relay_lines(stream, kind, sink.as_ref()).await,
            None => read_all(stream).await,
        }
    })
}

async fn read_all<R: AsyncRead + Unpin>(mut stream: R) -> String {
    let mut buf = Vec::new();
    if let Err(e) = stream.read_to_end(&mut buf).await {
        tracing::debug!(error = %e, "output stream closed with error");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn relay_lines<R: AsyncRead + Unpin>(stream: R, kind: StreamKind, sink: &dyn OutputSink) -> String {
    let mut reader = BufReader::new(stream);
    let mut captured = String::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                sink.line(kind, text.trim_end_matches(['\n', '\r']));
                captured.push_str(&text);
            }
            Err(e) => {
                tracing::debug!(stream = %kind, error = %e, "output stream closed with error");
                break;
            }
        }
    }
    captured
}

async fn join_reader(task: &mut JoinHandle<String>) -> String {
    task.await.unwrap_or_default()
}

async fn drain_or_abort(mut task: JoinHandle<String>) -> String {
    match tokio::time::timeout(DRAIN_GRACE, &mut task).await {
        Ok(joined) => joined.unwrap_or_default(),
        Err(_) => {
            task.abort();
            String::new()
        }
    }
}

/// Kill the whole process group, then reap the child.
///
/// `pgid` is the leader's pid captured at spawn; the leader may already be
/// reaped while other members still hold the output pipes.
async fn terminate(pgid: Option<u32>, child: &mut Child) {
    if let Some(raw) = pgid.and_then(|pid| i32::try_from(pid).ok()) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
    }
    let _ = child.start_kill();
    if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
        tracing::warn!("killed command was not reaped in time");
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
