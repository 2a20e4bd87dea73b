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

//! Per-session HTTP request counters.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::client::{
    BlobClient, BlobProperties, BlobServiceClient, ListBlobsOptions, ListBlobsPage, RemoteError,
    TransferOptions,
};

/// Counters for requests issued through a connection context.
#[derive(Debug, Default)]
pub struct HttpStats {
    head_count: AtomicU64,
    get_count: AtomicU64,
    list_count: AtomicU64,
    bytes_received: AtomicU64,
}

/// Point-in-time copy of [`HttpStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HttpStatsSnapshot {
    pub head_count: u64,
    pub get_count: u64,
    pub list_count: u64,
    pub bytes_received: u64,
}

impl HttpStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_head(&self) {
        self.head_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_get(&self, bytes: u64) {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_list(&self) {
        self.list_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HttpStatsSnapshot {
        HttpStatsSnapshot {
            head_count: self.head_count.load(Ordering::Relaxed),
            get_count: self.get_count.load(Ordering::Relaxed),
            list_count: self.list_count.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

/// Service client decorator that records every request into [`HttpStats`].
#[derive(Debug)]
pub struct StatsRecordingClient {
    inner: Arc<dyn BlobServiceClient>,
    stats: Arc<HttpStats>,
}

impl StatsRecordingClient {
    pub fn new(inner: Arc<dyn BlobServiceClient>, stats: Arc<HttpStats>) -> Self {
        Self { inner, stats }
    }
}

#[async_trait]
impl BlobServiceClient for StatsRecordingClient {
    fn account_url(&self) -> &str {
        self.inner.account_url()
    }

    fn blob_client(&self, container: &str, path: &str) -> Arc<dyn BlobClient> {
        Arc::new(StatsRecordingBlobClient {
            inner: self.inner.blob_client(container, path),
            stats: Arc::clone(&self.stats),
        })
    }

    async fn list_blobs(
        &self,
        container: &str,
        options: &ListBlobsOptions,
    ) -> Result<ListBlobsPage, RemoteError> {
        self.stats.record_list();
        self.inner.list_blobs(container, options).await
    }
}

struct StatsRecordingBlobClient {
    inner: Arc<dyn BlobClient>,
    stats: Arc<HttpStats>,
}

#[async_trait]
impl BlobClient for StatsRecordingBlobClient {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn properties(&self) -> Result<BlobProperties, RemoteError> {
        self.stats.record_head();
        self.inner.properties().await
    }

    async fn download_range(
        &self,
        offset: u64,
        length: u64,
        transfer: TransferOptions,
    ) -> Result<Bytes, RemoteError> {
        let data = self.inner.download_range(offset, length, transfer).await?;
        self.stats.record_get(data.len() as u64);
        Ok(data)
    }
}
