// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Play recap emitted by `ansible-playbook` under the JSON stdout callback.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Errors from parsing a play recap.
#[derive(Debug, thiserror::Error)]
pub enum RecapError {
    #[error("no JSON object in playbook output")]
    NoJson,
    #[error("invalid play recap: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-host task counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    #[serde(default)]
    pub changed: u64,
    #[serde(default)]
    pub failures: u64,
    #[serde(default)]
    pub ok: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub unreachable: u64,
    #[serde(default)]
    pub rescued: u64,
    #[serde(default)]
    pub ignored: u64,
}

impl HostStats {
    /// `(status, count)` pairs published as the play summary.
    pub fn summary(&self) -> [(&'static str, u64); 5] {
        [
            ("ok", self.ok),
            ("skipped", self.skipped),
            ("changed", self.changed),
            ("failures", self.failures),
            ("unreachable", self.unreachable),
        ]
    }
}

/// The `stats` section of a JSON-callback run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRecap {
    #[serde(default)]
    pub stats: BTreeMap<String, HostStats>,
}

impl PlayRecap {
    /// Parse captured stdout.
    ///
    /// Tolerates noise before the opening brace or after the closing one,
    /// which some plugins print outside the JSON document.
    pub fn parse(stdout: &str) -> Result<Self, RecapError> {
        let trimmed = stdout.trim();
        match serde_json::from_str(trimmed) {
            Ok(recap) => Ok(recap),
            Err(first) => {
                let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
                    return Err(RecapError::NoJson);
                };
                if start >= end || (start == 0 && end + 1 == trimmed.len()) {
                    return Err(RecapError::Json(first));
                }
                Ok(serde_json::from_str(&trimmed[start..=end])?)
            }
        }
    }

    pub fn host(&self, name: &str) -> Option<&HostStats> {
        self.stats.get(name)
    }
}

#[cfg(test)]
#[path = "recap_tests.rs"]
mod tests;
