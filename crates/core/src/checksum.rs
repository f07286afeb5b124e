// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MD5 checksums used to gate bundle downloads.
//!
//! A checksum is always the 32-character lowercase hex encoding of a 128-bit
//! digest. Equality is exact string equality.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

const HEX_LEN: usize = 32;
const READ_CHUNK: usize = 64 * 1024;

/// Errors from parsing a checksum body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChecksumError {
    #[error("checksum body is empty")]
    Empty,
    #[error("checksum `{0}` is not {HEX_LEN} hex characters")]
    Malformed(String),
}

/// A normalised hex-encoded MD5 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Parse a companion checksum body.
    ///
    /// Accepts `md5sum`-style bodies (`<hex>  <file>`): the first
    /// whitespace-separated token is taken and lowercased.
    pub fn parse(body: &str) -> Result<Self, ChecksumError> {
        let token = body.split_whitespace().next().ok_or(ChecksumError::Empty)?;
        let token = token.to_ascii_lowercase();
        if token.len() != HEX_LEN || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ChecksumError::Malformed(token));
        }
        Ok(Self(token))
    }

    /// Digest of an in-memory buffer.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(hex::encode(Md5::digest(data)))
    }

    /// Streaming digest of a file.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn of_file(path: &Path) -> io::Result<Option<Self>> {
        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let mut hasher = Md5::new();
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Some(Self(hex::encode(hasher.finalize()))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local and remote checksums for one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChecksumPair {
    pub local: Option<Checksum>,
    pub remote: Option<Checksum>,
}

impl ChecksumPair {
    pub fn new(local: Option<Checksum>, remote: Option<Checksum>) -> Self {
        Self { local, remote }
    }

    /// True only when both sides are known and equal.
    pub fn is_fresh(&self) -> bool {
        matches!((&self.local, &self.remote), (Some(l), Some(r)) if l == r)
    }
}

#[cfg(test)]
#[path = "checksum_tests.rs"]
mod tests;
