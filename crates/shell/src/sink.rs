// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Destinations for live command output.

use ap_core::StreamKind;
use parking_lot::Mutex;

/// Receives output lines as they are produced.
///
/// Lines arrive without their trailing newline. Called from reader tasks, so
/// implementations must not block for long.
pub trait OutputSink: Send + Sync {
    fn line(&self, stream: StreamKind, line: &str);
}

/// Relays to the daemon's own stdout/stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdioSink;

impl OutputSink for StdioSink {
    #[allow(clippy::print_stdout, clippy::print_stderr)]
    fn line(&self, stream: StreamKind, line: &str) {
        match stream {
            StreamKind::Stdout => println!("{line}"),
            StreamKind::Stderr => eprintln!("{line}"),
        }
    }
}

/// Collects relayed lines in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(StreamKind, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(StreamKind, String)> {
        self.lines.lock().clone()
    }

    pub fn lines_for(&self, stream: StreamKind) -> Vec<String> {
        self.lines.lock().iter().filter(|(s, _)| *s == stream).map(|(_, l)| l.clone()).collect()
    }
}

impl OutputSink for MemorySink {
    fn line(&self, stream: StreamKind, line: &str) {
        self.lines.lock().push((stream, line.to_string()));
    }
}
