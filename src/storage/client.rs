// Copyright 2025 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.
//
// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Boundary to the remote blob service.
//!
//! The filesystem only ever talks to the storage account through these traits.
//! The production implementation lives in [`super::object_store`]; tests plug in
//! the same implementation over an in-memory store.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use super::config::ReadOptions;

/// Failure reported by the remote client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// A recognized storage-service error response
    Service {
        status: u16,
        code: String,
        reason: String,
        message: String,
    },
    /// The blob name or prefix is not a valid object path
    InvalidPath(String),
    /// Anything else (transport failure, credential acquisition, ...)
    Other(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            RemoteError::Service {
                status,
                code,
                reason,
                message,
            } => write!(f, "{} {} ({}): {}", status, code, reason, message),
            RemoteError::InvalidPath(message) => write!(f, "Invalid blob path: {}", message),
            RemoteError::Other(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Properties returned by a blob metadata fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobProperties {
    /// Blob size in bytes
    pub size: u64,

    /// Last modified timestamp reported by the service
    pub last_modified: Option<DateTime<Utc>>,
}

/// Transfer tuning for a single ranged download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOptions {
    pub concurrency: usize,
    pub chunk_size: u64,
}

impl From<&ReadOptions> for TransferOptions {
    fn from(options: &ReadOptions) -> Self {
        Self {
            concurrency: options.transfer_concurrency,
            chunk_size: options.transfer_chunk_size,
        }
    }
}

/// A listed blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    pub name: String,
    pub size: u64,
}

/// Options for one listing call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBlobsOptions {
    /// Server-side prefix filter (plain string prefix, not segment-aligned)
    pub prefix: Option<String>,

    /// Token returned by the previous page
    pub continuation_token: Option<String>,

    /// Maximum number of results per page, service default when unset
    pub page_size: Option<usize>,
}

/// One page of listing results
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBlobsPage {
    pub blobs: Vec<BlobItem>,
    pub next_page_token: Option<String>,
}

/// Client for a single blob.
#[async_trait]
pub trait BlobClient: Send + Sync {
    /// Blob name within its container.
    fn name(&self) -> &str;

    /// Fetch the blob's properties (one HEAD round trip).
    async fn properties(&self) -> Result<BlobProperties, RemoteError>;

    /// Download exactly `length` bytes starting at `offset`.
    async fn download_range(
        &self,
        offset: u64,
        length: u64,
        transfer: TransferOptions,
    ) -> Result<Bytes, RemoteError>;
}

/// Authenticated client for one storage account.
#[async_trait]
pub trait BlobServiceClient: Send + Sync {
    /// Base URL of the storage account.
    fn account_url(&self) -> &str;

    /// Client for the blob at `path` inside `container`. No network I/O.
    fn blob_client(&self, container: &str, path: &str) -> Arc<dyn BlobClient>;

    /// List one page of blobs in `container`.
    async fn list_blobs(
        &self,
        container: &str,
        options: &ListBlobsOptions,
    ) -> Result<ListBlobsPage, RemoteError>;
}

impl Debug for dyn BlobServiceClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "BlobServiceClient(account_url={})", self.account_url())
    }
}

impl Debug for dyn BlobClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "BlobClient(name={})", self.name())
    }
}
