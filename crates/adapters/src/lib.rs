// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ap-adapters: Transports, archives, environments and inventories

pub mod archive;
pub mod download;
pub mod fetch;
pub mod identity;
pub mod inventory;
pub mod venv;

#[cfg(test)]
mod test_server;

pub use archive::{extract, ExtractError, ExtractSummary};
pub use download::{
    checksum_locator, DownloadError, Downloader, HttpAuth, HttpDownloader, LocalFileDownloader,
    LocatorDownloader, ObjectLocation, ObjectStoreClient, ObjectStoreDownloader, S3ObjectStore,
};
pub use fetch::{fetch, FetchError, FetchOutcome};
pub use identity::{local_candidates, local_hostname, IdentityError};
pub use inventory::{InventoryMatch, InventoryResolver, ResolveError};
pub use venv::{EnvironmentProvisioner, ProvisionError};

#[cfg(any(test, feature = "test-support"))]
pub use download::{DownloadCall, FakeDownloader, HttpObjectStore};
