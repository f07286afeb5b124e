// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP(S) transport with optional basic auth and a custom header.

use std::path::Path;
use std::time::Duration;

use ap_core::Checksum;
use async_trait::async_trait;
use reqwest::StatusCode;

use super::{parse_checksum, write_stream, DownloadError, Downloader};

/// Bound on a checksum request.
pub const CHECKSUM_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound on a payload request, body included.
pub const PAYLOAD_TIMEOUT: Duration = Duration::from_secs(15);

/// Credentials attached to every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpAuth {
    pub basic: Option<(String, String)>,
    pub header: Option<(String, String)>,
}

impl HttpAuth {
    /// Build from possibly-empty settings. Half-configured pairs are ignored.
    pub fn from_parts(user: &str, pass: &str, header_name: &str, header_value: &str) -> Self {
        let pair = |a: &str, b: &str| {
            (!a.is_empty() && !b.is_empty()).then(|| (a.to_string(), b.to_string()))
        };
        Self { basic: pair(user, pass), header: pair(header_name, header_value) }
    }
}

#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
    auth: HttpAuth,
    checksum_timeout: Duration,
    payload_timeout: Duration,
}

impl HttpDownloader {
    pub fn new(auth: HttpAuth) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth,
            checksum_timeout: CHECKSUM_TIMEOUT,
            payload_timeout: PAYLOAD_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, checksum: Duration, payload: Duration) -> Self {
        self.checksum_timeout = checksum;
        self.payload_timeout = payload;
        self
    }

    fn get(&self, url: &str, timeout: Duration) -> reqwest::RequestBuilder {
        let mut req = self.client.get(url).timeout(timeout);
        if let Some((user, pass)) = &self.auth.basic {
            req = req.basic_auth(user, Some(pass));
        }
        if let Some((name, value)) = &self.auth.header {
            req = req.header(name.as_str(), value.as_str());
        }
        req
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, locator: &str, dest: &Path) -> Result<(), DownloadError> {
        let resp = self
            .get(locator, self.payload_timeout)
            .send()
            .await
            .map_err(|e| DownloadError::transport(locator, e))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DownloadError::NotFound { locator: locator.to_string() });
        }
        if !status.is_success() {
            return Err(DownloadError::Status { locator: locator.to_string(), status: status.as_u16() });
        }
        write_stream(locator, resp.bytes_stream(), dest).await?;
        Ok(())
    }

    async fn remote_checksum(&self, locator: &str) -> Result<Option<Checksum>, DownloadError> {
        let resp = self
            .get(locator, self.checksum_timeout)
            .send()
            .await
            .map_err(|e| DownloadError::transport(locator, e))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(%locator, "no remote checksum published");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DownloadError::Status { locator: locator.to_string(), status: status.as_u16() });
        }
        let body = resp.bytes().await.map_err(|e| DownloadError::transport(locator, e))?;
        let checksum = parse_checksum(locator, &body)?;
        tracing::debug!(%locator, %checksum, "found remote checksum");
        Ok(Some(checksum))
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
