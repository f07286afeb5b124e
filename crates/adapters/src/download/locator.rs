// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic locator: picks a transport from the locator's scheme.

use std::path::Path;
use std::sync::Arc;

use ap_core::Checksum;
use async_trait::async_trait;

use super::{
    DownloadError, Downloader, HttpAuth, HttpDownloader, LocalFileDownloader, ObjectStoreDownloader,
    S3ObjectStore,
};

/// Transport family of a locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scheme {
    Http,
    ObjectStore,
    File,
}

impl Scheme {
    pub(crate) fn of(locator: &str) -> Option<Self> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            Some(Scheme::Http)
        } else if locator.starts_with("s3://") || locator.starts_with("arn:") {
            Some(Scheme::ObjectStore)
        } else if locator.starts_with("file://") || locator.starts_with('/') {
            Some(Scheme::File)
        } else {
            None
        }
    }
}

/// Dispatches each call to the HTTP, object-store, or local-file transport.
#[derive(Clone)]
pub struct LocatorDownloader {
    http: HttpDownloader,
    object_store: ObjectStoreDownloader,
    local: LocalFileDownloader,
}

impl LocatorDownloader {
    pub fn new(http: HttpDownloader, object_store: ObjectStoreDownloader) -> Self {
        Self { http, object_store, local: LocalFileDownloader }
    }

    /// Unauthenticated HTTP and the SDK object store with its default credentials.
    pub fn with_defaults(region: Option<&str>, endpoint: Option<&str>) -> Self {
        Self::new(
            HttpDownloader::new(HttpAuth::default()),
            ObjectStoreDownloader::new(Arc::new(S3ObjectStore::new(region, endpoint))),
        )
    }

    fn route(&self, locator: &str) -> Result<&dyn Downloader, DownloadError> {
        match Scheme::of(locator) {
            Some(Scheme::Http) => Ok(&self.http),
            Some(Scheme::ObjectStore) => Ok(&self.object_store),
            Some(Scheme::File) => Ok(&self.local),
            None => Err(DownloadError::MalformedLocator(locator.to_string())),
        }
    }
}

#[async_trait]
impl Downloader for LocatorDownloader {
    async fn download(&self, locator: &str, dest: &Path) -> Result<(), DownloadError> {
        self.route(locator)?.download(locator, dest).await
    }

    async fn remote_checksum(&self, locator: &str) -> Result<Option<Checksum>, DownloadError> {
        self.route(locator)?.remote_checksum(locator).await
    }
}

#[cfg(test)]
#[path = "locator_tests.rs"]
mod tests;
