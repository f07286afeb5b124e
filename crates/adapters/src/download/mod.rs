// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transports that fetch a bundle and its companion checksum.
//!
//! Every variant implements the same two operations. A missing checksum is
//! not an error: it means "unknown, download unconditionally".

mod http;
mod local;
mod locator;
mod object_store;

pub use http::{HttpAuth, HttpDownloader, CHECKSUM_TIMEOUT, PAYLOAD_TIMEOUT};
pub use local::LocalFileDownloader;
pub use locator::LocatorDownloader;
#[cfg(any(test, feature = "test-support"))]
pub use object_store::HttpObjectStore;
pub use object_store::{ByteStream, ObjectLocation, ObjectStoreClient, ObjectStoreDownloader, S3ObjectStore};

use std::ffi::OsString;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};

use ap_core::{Checksum, ChecksumError, ErrorKind};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// Suffix of the conventional companion checksum locator.
pub const CHECKSUM_SUFFIX: &str = ".md5";

/// Errors from a transport.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request for {locator} failed: {message}")]
    Transport { locator: String, message: String },

    #[error("{locator} answered with status {status}")]
    Status { locator: String, status: u16 },

    #[error("{locator} does not exist")]
    NotFound { locator: String },

    #[error("malformed locator `{0}`")]
    MalformedLocator(String),

    #[error("malformed checksum at {locator}: {source}")]
    MalformedChecksum { locator: String, source: ChecksumError },

    #[error("cannot write {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl DownloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::MalformedLocator(_) | DownloadError::MalformedChecksum { .. } => {
                ErrorKind::Format
            }
            DownloadError::Transport { .. }
            | DownloadError::Status { .. }
            | DownloadError::NotFound { .. }
            | DownloadError::Io { .. } => ErrorKind::Transport,
        }
    }

    pub(crate) fn transport(locator: &str, err: impl Display) -> Self {
        DownloadError::Transport { locator: locator.to_string(), message: err.to_string() }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        DownloadError::Io { path: path.to_path_buf(), source }
    }
}

/// A transport for one family of locators.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Stream the object at `locator` into `dest`.
    ///
    /// `dest` is replaced atomically: on failure the previous file is intact.
    async fn download(&self, locator: &str, dest: &Path) -> Result<(), DownloadError>;

    /// Fetch the checksum published at `locator`.
    ///
    /// `Ok(None)` when nothing is published there.
    async fn remote_checksum(&self, locator: &str) -> Result<Option<Checksum>, DownloadError>;
}

/// Conventional companion checksum locator: `<locator>.md5`.
pub fn checksum_locator(locator: &str) -> String {
    format!("{locator}{CHECKSUM_SUFFIX}")
}

/// Parse a fetched checksum body, attributing failures to `locator`.
pub(crate) fn parse_checksum(locator: &str, body: &[u8]) -> Result<Checksum, DownloadError> {
    Checksum::parse(&String::from_utf8_lossy(body))
        .map_err(|source| DownloadError::MalformedChecksum { locator: locator.to_string(), source })
}

/// `<dest>.part`, the staging file for an in-progress download.
pub(crate) fn part_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Removes the staging file unless the download was committed.
struct PartFile {
    path: PathBuf,
    committed: bool,
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Write a byte stream to `dest` via `<dest>.part` and an atomic rename.
///
/// Chunks are written as they arrive; the object is never held in memory.
pub(crate) async fn write_stream<S, E>(
    locator: &str,
    stream: S,
    dest: &Path,
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Display + Send,
{
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| DownloadError::io(parent, e))?;
    }

    let mut stream = std::pin::pin!(stream);
    let mut part = PartFile { path: part_path(dest), committed: false };
    let mut file =
        tokio::fs::File::create(&part.path).await.map_err(|e| DownloadError::io(&part.path, e))?;

    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::transport(locator, e))?;
        file.write_all(&chunk).await.map_err(|e| DownloadError::io(&part.path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| DownloadError::io(&part.path, e))?;
    file.sync_all().await.map_err(|e| DownloadError::io(&part.path, e))?;
    drop(file);

    tokio::fs::rename(&part.path, dest).await.map_err(|e| DownloadError::io(dest, e))?;
    part.committed = true;
    tracing::debug!(%locator, bytes = written, dest = %dest.display(), "download written");
    Ok(written)
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{DownloadError, Downloader};
    use ap_core::Checksum;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    /// Recorded transport call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum DownloadCall {
        Download(String),
        Checksum(String),
    }

    #[derive(Default)]
    struct FakeDownloaderState {
        objects: HashMap<String, Vec<u8>>,
        failing_checksums: HashMap<String, u16>,
        calls: Vec<DownloadCall>,
    }

    /// In-memory downloader for testing
    #[derive(Clone, Default)]
    pub struct FakeDownloader {
        inner: Arc<Mutex<FakeDownloaderState>>,
    }

    impl FakeDownloader {
        pub fn new() -> Self {
            Self::default()
        }

        /// Publish (or replace) an object.
        pub fn put(&self, locator: &str, body: impl Into<Vec<u8>>) {
            self.inner.lock().objects.insert(locator.to_string(), body.into());
        }

        pub fn remove(&self, locator: &str) {
            self.inner.lock().objects.remove(locator);
        }

        /// Make checksum requests for `locator` fail with `status`.
        pub fn fail_checksum(&self, locator: &str, status: u16) {
            self.inner.lock().failing_checksums.insert(locator.to_string(), status);
        }

        pub fn calls(&self) -> Vec<DownloadCall> {
            self.inner.lock().calls.clone()
        }

        pub fn download_count(&self) -> usize {
            self.inner.lock().calls.iter().filter(|c| matches!(c, DownloadCall::Download(_))).count()
        }
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(&self, locator: &str, dest: &Path) -> Result<(), DownloadError> {
            let body = {
                let mut state = self.inner.lock();
                state.calls.push(DownloadCall::Download(locator.to_string()));
                state.objects.get(locator).cloned()
            };
            let body = body.ok_or_else(|| DownloadError::NotFound { locator: locator.to_string() })?;
            let stream = futures_util::stream::iter([Ok::<_, std::io::Error>(body.into())]);
            super::write_stream(locator, stream, dest).await.map(|_| ())
        }

        async fn remote_checksum(&self, locator: &str) -> Result<Option<Checksum>, DownloadError> {
            let mut state = self.inner.lock();
            state.calls.push(DownloadCall::Checksum(locator.to_string()));
            if let Some(status) = state.failing_checksums.get(locator) {
                return Err(DownloadError::Status { locator: locator.to_string(), status: *status });
            }
            match state.objects.get(locator) {
                Some(body) => super::parse_checksum(locator, body).map(Some),
                None => Ok(None),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{DownloadCall, FakeDownloader};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
