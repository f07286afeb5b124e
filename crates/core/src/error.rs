// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure classes shared by every pipeline stage.

use serde::{Deserialize, Serialize};

/// Coarse classification of a run failure.
///
/// Each component error maps onto exactly one kind so logs and tests can
/// assert the class of a failure without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network, auth, or non-2xx response.
    Transport,
    /// Checksum mismatch after download.
    Integrity,
    /// Not gzip, or a malformed locator or checksum.
    Format,
    /// Corrupt or truncated archive.
    Extraction,
    /// Environment create/update failure.
    Provision,
    /// Subprocess start failure, non-zero exit, or deadline exceeded.
    Execution,
    /// No inventory match, or a missing inventory file.
    Resolution,
    /// Invalid startup configuration.
    Configuration,
}

crate::simple_display! {
    ErrorKind {
        Transport => "transport",
        Integrity => "integrity",
        Format => "format",
        Extraction => "extraction",
        Provision => "provision",
        Execution => "execution",
        Resolution => "resolution",
        Configuration => "configuration",
    }
}
