// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checksum-gated bundle retrieval.
//!
//! The cached artifact is only replaced when its checksum differs from the
//! published one, or when nothing is published. A download lands beside the
//! cache and is verified there; the cache is untouched until it passes.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use ap_core::{Checksum, ChecksumPair, ErrorKind};
use thiserror::Error;

use crate::download::{checksum_locator, DownloadError, Downloader};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot checksum cached file {}: {source}", path.display())]
    Local { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("checksum mismatch for {locator}: expected {expected}, got {actual}")]
    Integrity { locator: String, expected: Checksum, actual: Checksum },

    #[error("cannot replace cached file {}: {source}", path.display())]
    Commit { path: PathBuf, source: io::Error },
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Local { .. } | FetchError::Commit { .. } => ErrorKind::Transport,
            FetchError::Download(e) => e.kind(),
            FetchError::Integrity { .. } => ErrorKind::Integrity,
        }
    }
}

/// What a fetch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Local copy already matches the published checksum.
    Cached,
    /// A download happened; `verified` when a published checksum was checked.
    Downloaded { verified: bool },
}

/// Bring `dest` up to date with `locator`.
///
/// `checksum_at` overrides the conventional `<locator>.md5` companion.
pub async fn fetch(
    downloader: &dyn Downloader,
    locator: &str,
    checksum_at: Option<&str>,
    dest: &Path,
) -> Result<FetchOutcome, FetchError> {
    let local = local_checksum(dest).await?;
    if local.is_none() {
        tracing::info!(path = %dest.display(), "no cached bundle yet");
    }

    let checksum_at = checksum_at.map(str::to_string).unwrap_or_else(|| checksum_locator(locator));
    let remote = downloader.remote_checksum(&checksum_at).await?;

    let pair = ChecksumPair::new(local, remote);
    tracing::debug!(local = ?pair.local, remote = ?pair.remote, "comparing checksums");
    if pair.is_fresh() {
        tracing::debug!(%locator, "cached bundle is current, skipping download");
        return Ok(FetchOutcome::Cached);
    }

    tracing::info!(%locator, "downloading bundle");
    let staged = Staged::beside(dest);
    downloader.download(locator, &staged.path).await?;

    let Some(expected) = pair.remote else {
        staged.commit(dest).await?;
        return Ok(FetchOutcome::Downloaded { verified: false });
    };
    let actual = local_checksum(&staged.path).await?.ok_or_else(|| FetchError::Local {
        path: staged.path.clone(),
        source: io::Error::new(io::ErrorKind::NotFound, "downloaded file vanished"),
    })?;
    if actual != expected {
        return Err(FetchError::Integrity { locator: locator.to_string(), expected, actual });
    }
    staged.commit(dest).await?;
    tracing::info!(%locator, checksum = %actual, "bundle checksum verified");
    Ok(FetchOutcome::Downloaded { verified: true })
}

/// A fresh download awaiting verification, removed unless committed.
struct Staged {
    path: PathBuf,
    committed: bool,
}

impl Staged {
    /// `<dest>.download`
    fn beside(dest: &Path) -> Self {
        let mut name: OsString = dest.as_os_str().to_owned();
        name.push(".download");
        Self { path: PathBuf::from(name), committed: false }
    }

    async fn commit(mut self, dest: &Path) -> Result<(), FetchError> {
        tokio::fs::rename(&self.path, dest)
            .await
            .map_err(|source| FetchError::Commit { path: dest.to_path_buf(), source })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for Staged {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

async fn local_checksum(path: &Path) -> Result<Option<Checksum>, FetchError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || Checksum::of_file(&owned))
        .await
        .map_err(|e| FetchError::Local { path: path.to_path_buf(), source: io::Error::other(e) })?
        .map_err(|source| FetchError::Local { path: path.to_path_buf(), source })
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
