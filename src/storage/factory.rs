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

use std::fmt::Debug;
use std::sync::Arc;
use tracing::info;

use super::client::BlobServiceClient;
use super::config::{self, parse_bool_setting, ReadOptions};
use super::context::ConnectionContext;
use super::credentials::{self, ConnectionSpec};
use super::error::StorageResult;
use super::opener::FileOpener;
use super::stats::StatsRecordingClient;
use crate::filesystem::url::ParsedUrl;

/// Turns a resolved [`ConnectionSpec`] into an authenticated account client.
pub trait Connector: Send + Sync + Debug {
    fn connect(&self, spec: &ConnectionSpec) -> StorageResult<Arc<dyn BlobServiceClient>>;
}

/// Factory for connection contexts
pub struct ContextFactory;

impl ContextFactory {
    /// Create a fresh connection context for `path`.
    ///
    /// Resolves credentials, builds the client through `connector`, and reads the
    /// read tuning from the session settings. When `azure_http_stats` is on the
    /// client records into the opener's statistics sink.
    ///
    /// # Arguments
    ///
    /// * `connector` - Builds the account client from the resolved credentials
    /// * `opener` - Session settings, secrets and statistics
    /// * `path` - Full URL being accessed
    /// * `parsed_url` - Parsed form of `path`
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * Credentials cannot be resolved
    /// * A read setting is malformed or zero
    /// * The client cannot be built from the resolved credentials
    pub fn create(
        connector: &dyn Connector,
        opener: &dyn FileOpener,
        path: &str,
        parsed_url: &ParsedUrl,
    ) -> StorageResult<Arc<ConnectionContext>> {
        let spec = credentials::resolve(opener, path, parsed_url)?;
        let read_options = ReadOptions::from_settings(|key| opener.setting(key))?;

        let mut service_client = connector.connect(&spec)?;
        let http_stats = parse_bool_setting(
            config::HTTP_STATS,
            opener.setting(config::HTTP_STATS).as_deref(),
        )?
        .unwrap_or(false);
        if http_stats {
            if let Some(stats) = opener.http_stats() {
                service_client = Arc::new(StatsRecordingClient::new(service_client, stats));
            }
        }

        info!(
            "Created connection context for account={}, credential={}, buffer_size={}",
            spec.account_name,
            spec.credential.kind(),
            read_options.buffer_size
        );
        Ok(Arc::new(ConnectionContext::new(service_client, read_options)))
    }
}
