// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local filesystem transport for `file://` URLs and absolute paths.

use std::io;
use std::path::{Path, PathBuf};

use ap_core::Checksum;
use async_trait::async_trait;
use tokio_util::io::ReaderStream;

use super::{parse_checksum, write_stream, DownloadError, Downloader};

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileDownloader;

impl LocalFileDownloader {
    /// Strip a `file://` scheme; plain paths pass through.
    pub fn path_of(locator: &str) -> PathBuf {
        PathBuf::from(locator.strip_prefix("file://").unwrap_or(locator))
    }
}

#[async_trait]
impl Downloader for LocalFileDownloader {
    async fn download(&self, locator: &str, dest: &Path) -> Result<(), DownloadError> {
        let source = Self::path_of(locator);
        let file = match tokio::fs::File::open(&source).await {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DownloadError::NotFound { locator: locator.to_string() })
            }
            Err(e) => return Err(DownloadError::transport(locator, e)),
        };
        write_stream(locator, ReaderStream::new(file), dest).await?;
        Ok(())
    }

    async fn remote_checksum(&self, locator: &str) -> Result<Option<Checksum>, DownloadError> {
        match tokio::fs::read(Self::path_of(locator)).await {
            Ok(body) => parse_checksum(locator, &body).map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DownloadError::transport(locator, e)),
        }
    }
}
