// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object-store transport addressed by `s3://bucket/key` or object ARN.

use std::fmt;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use ap_core::Checksum;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectError;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use regex::Regex;
use tokio::sync::OnceCell;
use tokio_util::io::ReaderStream;

use super::{parse_checksum, write_stream, DownloadError, Downloader, CHECKSUM_TIMEOUT, PAYLOAD_TIMEOUT};

/// Largest checksum body read into memory.
const MAX_CHECKSUM_BODY: usize = 4096;

#[allow(clippy::expect_used)]
static URI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^s3://([^/]+)/(.+)$").expect("constant regex pattern is valid"));

#[allow(clippy::expect_used)]
static ARN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[\w-]*:s3:.*:.*:([^/]+)/(.+)$").expect("constant regex pattern is valid")
});

/// A bucket and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    /// Parse an `s3://bucket/key` URI or an object ARN.
    pub fn parse(locator: &str) -> Result<Self, DownloadError> {
        let caps = URI_PATTERN
            .captures(locator)
            .or_else(|| ARN_PATTERN.captures(locator))
            .ok_or_else(|| DownloadError::MalformedLocator(locator.to_string()))?;
        Ok(Self { bucket: caps[1].to_string(), key: caps[2].to_string() })
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Object bytes as a stream of chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

/// Fetches object bytes; the storage SDK seam.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// `Ok(None)` when the object does not exist. `timeout` bounds the request.
    async fn get(
        &self,
        location: &ObjectLocation,
        timeout: Duration,
    ) -> Result<Option<ByteStream>, DownloadError>;
}

/// Region used when neither settings nor the environment name one.
const FALLBACK_REGION: &str = "us-east-1";

/// S3 through the AWS SDK.
///
/// Credentials come from the SDK's default chain (environment, shared
/// profile, instance role). The client is built on first use so that
/// configurations without an object-store source never touch it.
#[derive(Debug)]
pub struct S3ObjectStore {
    region: Option<String>,
    endpoint: Option<String>,
    client: OnceCell<aws_sdk_s3::Client>,
}

impl S3ObjectStore {
    /// `endpoint` selects an S3-compatible service and path-style addressing.
    pub fn new(region: Option<&str>, endpoint: Option<&str>) -> Self {
        let setting = |v: Option<&str>| v.filter(|v| !v.is_empty()).map(str::to_string);
        Self { region: setting(region), endpoint: setting(endpoint), client: OnceCell::new() }
    }

    /// Wrap an already configured SDK client.
    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { region: None, endpoint: None, client: OnceCell::from(client) }
    }

    async fn client(&self) -> &aws_sdk_s3::Client {
        self.client.get_or_init(|| load_client(self.region.clone(), self.endpoint.clone())).await
    }
}

async fn load_client(region: Option<String>, endpoint: Option<String>) -> aws_sdk_s3::Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region));
    }
    let shared = loader.load().await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared);
    if shared.region().is_none() {
        builder = builder.region(Region::new(FALLBACK_REGION));
    }
    if let Some(endpoint) = endpoint {
        tracing::debug!(%endpoint, "using custom object-store endpoint");
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}

#[async_trait]
impl ObjectStoreClient for S3ObjectStore {
    async fn get(
        &self,
        location: &ObjectLocation,
        timeout: Duration,
    ) -> Result<Option<ByteStream>, DownloadError> {
        let locator = location.to_string();
        let request = self.client().await.get_object().bucket(&location.bucket).key(&location.key).send();
        let response = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| DownloadError::transport(&locator, format!("no response within {timeout:?}")))?;

        match response {
            Ok(output) => Ok(Some(Box::pin(ReaderStream::new(output.body.into_async_read())))),
            Err(err) if err.as_service_error().is_some_and(GetObjectError::is_no_such_key) => Ok(None),
            Err(err) => match err.raw_response().map(|raw| raw.status().as_u16()) {
                Some(404) => Ok(None),
                Some(status) => Err(DownloadError::Status { locator, status }),
                None => Err(DownloadError::transport(&locator, DisplayErrorContext(&err))),
            },
        }
    }
}

/// Unsigned path-style GETs against an S3-compatible HTTP endpoint.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
}

#[cfg(any(test, feature = "test-support"))]
impl HttpObjectStore {
    pub fn new(endpoint: &str) -> Self {
        Self { client: reqwest::Client::new(), endpoint: endpoint.trim_end_matches('/').to_string() }
    }

    pub fn object_url(&self, location: &ObjectLocation) -> String {
        format!("{}/{}/{}", self.endpoint, location.bucket, location.key)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ObjectStoreClient for HttpObjectStore {
    async fn get(
        &self,
        location: &ObjectLocation,
        timeout: Duration,
    ) -> Result<Option<ByteStream>, DownloadError> {
        use futures_util::TryStreamExt;

        let url = self.object_url(location);
        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| DownloadError::transport(&url, e))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DownloadError::Status { locator: url, status: status.as_u16() });
        }
        Ok(Some(Box::pin(resp.bytes_stream().map_err(io::Error::other))))
    }
}

/// Downloader over any [`ObjectStoreClient`].
///
/// Checksum and payload requests get the same bounds as the HTTP transport.
#[derive(Clone)]
pub struct ObjectStoreDownloader {
    client: Arc<dyn ObjectStoreClient>,
    checksum_timeout: Duration,
    payload_timeout: Duration,
}

impl ObjectStoreDownloader {
    pub fn new(client: Arc<dyn ObjectStoreClient>) -> Self {
        Self { client, checksum_timeout: CHECKSUM_TIMEOUT, payload_timeout: PAYLOAD_TIMEOUT }
    }

    pub fn with_timeouts(mut self, checksum: Duration, payload: Duration) -> Self {
        self.checksum_timeout = checksum;
        self.payload_timeout = payload;
        self
    }

    async fn read_checksum(
        &self,
        locator: &str,
        location: &ObjectLocation,
    ) -> Result<Option<Checksum>, DownloadError> {
        let Some(mut stream) = self.client.get(location, self.checksum_timeout).await? else {
            tracing::debug!(%location, "no remote checksum published");
            return Ok(None);
        };
        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::transport(locator, e))?;
            body.extend_from_slice(&chunk);
            if body.len() > MAX_CHECKSUM_BODY {
                break;
            }
        }
        parse_checksum(locator, &body).map(Some)
    }
}

#[async_trait]
impl Downloader for ObjectStoreDownloader {
    async fn download(&self, locator: &str, dest: &Path) -> Result<(), DownloadError> {
        let location = ObjectLocation::parse(locator)?;
        let stream = self
            .client
            .get(&location, self.payload_timeout)
            .await?
            .ok_or_else(|| DownloadError::NotFound { locator: location.to_string() })?;
        write_stream(locator, stream, dest).await?;
        Ok(())
    }

    async fn remote_checksum(&self, locator: &str) -> Result<Option<Checksum>, DownloadError> {
        let location = ObjectLocation::parse(locator)?;
        tokio::time::timeout(self.checksum_timeout, self.read_checksum(locator, &location))
            .await
            .map_err(|_| {
                DownloadError::transport(locator, format!("no checksum within {:?}", self.checksum_timeout))
            })?
    }
}

#[cfg(test)]
#[path = "object_store_tests.rs"]
mod tests;
