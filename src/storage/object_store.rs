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

use super::client::{
    BlobClient, BlobItem, BlobProperties, BlobServiceClient, ListBlobsOptions, ListBlobsPage,
    RemoteError, TransferOptions,
};
use super::credentials::{
    ChainSource, ConnectionSpec, ConnectionString, Credential, ProxyOptions, TransportKind,
    TransportOptions,
};
use super::error::{StorageError, StorageResult};
use super::factory::Connector;
use super::token::{ChainedCredential, ClientCertificateCredential};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, StreamExt, TryStreamExt};
use object_store::azure::{AzureCredentialProvider, MicrosoftAzureBuilder};
use object_store::path::Path as ObjectPath;
use object_store::prefix::PrefixStore;
use object_store::{ClientOptions, ObjectStore, ObjectStoreExt};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use url::Url;

/// Page size used when the caller does not ask for one.
const DEFAULT_PAGE_SIZE: usize = 5000;

/// Builds a store for one container.
pub type StoreFactory = dyn Fn(&str) -> Result<Arc<dyn ObjectStore>, RemoteError> + Send + Sync;

/// Production [`Connector`] backed by `object_store`'s Azure client.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjectStoreConnector;

impl ObjectStoreConnector {
    pub fn new() -> Self {
        Self
    }

    /// Build HTTP client options from the resolved transport settings.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the proxy URL cannot be parsed or the CA bundle
    /// cannot be read.
    fn build_client_options(
        transport: &TransportOptions,
        account_url: &str,
    ) -> StorageResult<ClientOptions> {
        let mut client_options = ClientOptions::default();
        if account_url.starts_with("http://") {
            client_options = client_options.with_allow_http(true);
        }

        if let Some(proxy) = &transport.proxy {
            client_options = client_options.with_proxy_url(Self::proxy_url(proxy)?);
            if let Some(ca_info) = &transport.ca_info {
                let pem = std::fs::read_to_string(ca_info).map_err(|e| {
                    StorageError::InvalidConfig(format!(
                        "Failed to read CA bundle '{}': {}",
                        ca_info.display(),
                        e
                    ))
                })?;
                client_options = client_options.with_proxy_ca_certificate(pem);
            }
        }

        if transport.kind == TransportKind::Curl {
            debug!(
                "Using curl transport settings ca_info={:?}, ca_path={:?}",
                transport.ca_info, transport.ca_path
            );
        }
        Ok(client_options)
    }

    /// Proxy URL with credentials embedded. A bare `host:port` is treated as http.
    fn proxy_url(proxy: &ProxyOptions) -> StorageResult<String> {
        let mut url = Url::parse(&proxy.host)
            .ok()
            .filter(|url| url.has_host())
            .map(Ok)
            .unwrap_or_else(|| Url::parse(&format!("http://{}", proxy.host)))
            .map_err(|e| {
                StorageError::InvalidConfig(format!("Invalid proxy '{}': {}", proxy.host, e))
            })?;

        if let Some(user_name) = &proxy.user_name {
            url.set_username(user_name).map_err(|_| {
                StorageError::InvalidConfig(format!("Proxy '{}' cannot carry a user", proxy.host))
            })?;
        }
        if let Some(password) = &proxy.password {
            url.set_password(Some(password)).map_err(|_| {
                StorageError::InvalidConfig(format!(
                    "Proxy '{}' cannot carry a password",
                    proxy.host
                ))
            })?;
        }
        Ok(url.to_string())
    }

    /// Azure builder configured for the credential in `spec`, without a container.
    ///
    /// Token sources that make their own requests get `client_options` so they go
    /// through the same proxy.
    fn build_azure_builder(
        spec: &ConnectionSpec,
        client_options: &ClientOptions,
    ) -> StorageResult<MicrosoftAzureBuilder> {
        let builder = match &spec.credential {
            Credential::ConnectionString(connection_string) => {
                return Ok(Self::connection_string_builder(connection_string, spec))
            }
            Credential::Anonymous => MicrosoftAzureBuilder::new().with_skip_signature(true),
            Credential::Chain(sources) => Self::chain_builder(spec, sources, client_options)?,
            Credential::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => MicrosoftAzureBuilder::new()
                .with_tenant_id(tenant_id)
                .with_client_id(client_id)
                .with_client_secret(client_secret),
            Credential::ClientCertificate {
                tenant_id,
                client_id,
                certificate_path,
            } => {
                let proxy_url = spec
                    .transport
                    .proxy
                    .as_ref()
                    .map(Self::proxy_url)
                    .transpose()?;
                let credential = ClientCertificateCredential::new(
                    tenant_id,
                    client_id,
                    certificate_path,
                    proxy_url.as_deref(),
                )?;
                MicrosoftAzureBuilder::new().with_credentials(Arc::new(credential))
            }
        };

        Ok(builder
            .with_account(&spec.account_name)
            .with_endpoint(spec.account_url.clone()))
    }

    fn connection_string_builder(
        connection_string: &ConnectionString,
        spec: &ConnectionSpec,
    ) -> MicrosoftAzureBuilder {
        if connection_string.use_development_storage() {
            return MicrosoftAzureBuilder::new().with_use_emulator(true);
        }

        let mut builder = MicrosoftAzureBuilder::new()
            .with_account(&spec.account_name)
            .with_endpoint(spec.account_url.clone());
        if let Some(key) = connection_string.account_key() {
            builder = builder.with_access_key(key);
        }
        if let Some(sas) = connection_string.shared_access_signature() {
            let pairs: Vec<(String, String)> = sas
                .trim_start_matches('?')
                .split('&')
                .filter_map(|pair| {
                    let (k, v) = pair.split_once('=')?;
                    Some((k.to_string(), v.to_string()))
                })
                .collect();
            builder = builder.with_sas_authorization(pairs);
        }
        builder
    }

    /// Builder whose token comes from the first source of the chain that succeeds.
    ///
    /// `default` expands to `env`, `cli`, `managed_identity`. `env` is left out
    /// when no service principal variables are set.
    fn chain_builder(
        spec: &ConnectionSpec,
        sources: &[ChainSource],
        client_options: &ClientOptions,
    ) -> StorageResult<MicrosoftAzureBuilder> {
        Ok(MicrosoftAzureBuilder::new()
            .with_credentials(Arc::new(Self::chained_credential(spec, sources, client_options)?)))
    }

    fn chained_credential(
        spec: &ConnectionSpec,
        sources: &[ChainSource],
        client_options: &ClientOptions,
    ) -> StorageResult<ChainedCredential> {
        let mut providers: Vec<(ChainSource, AzureCredentialProvider)> = Vec::new();
        for source in expand_chain(sources) {
            let builder = match source {
                ChainSource::Env if !env_credentials_available() => {
                    debug!("Credential source env has no service principal variables, skipping");
                    continue;
                }
                ChainSource::Env => MicrosoftAzureBuilder::from_env(),
                ChainSource::Cli => MicrosoftAzureBuilder::new().with_use_azure_cli(true),
                ChainSource::ManagedIdentity | ChainSource::Default => MicrosoftAzureBuilder::new(),
            };
            let store = builder
                .with_account(&spec.account_name)
                .with_container_name("$root")
                .with_client_options(client_options.clone())
                .build()
                .map_err(|e| {
                    StorageError::InvalidConfig(format!(
                        "Failed to create {:?} credential: {}",
                        source, e
                    ))
                })?;
            providers.push((source, Arc::clone(store.credentials())));
        }
        ChainedCredential::new(providers)
    }
}

/// Replace `default` by its members, keeping the first occurrence of each source.
fn expand_chain(sources: &[ChainSource]) -> Vec<ChainSource> {
    let mut expanded = Vec::new();
    for source in sources {
        let members: &[ChainSource] = match source {
            ChainSource::Default => &[
                ChainSource::Env,
                ChainSource::Cli,
                ChainSource::ManagedIdentity,
            ],
            other => std::slice::from_ref(other),
        };
        for member in members {
            if !expanded.contains(member) {
                expanded.push(*member);
            }
        }
    }
    expanded
}

fn env_credentials_available() -> bool {
    let set = |key: &str| std::env::var(key).map(|v| !v.is_empty()).unwrap_or(false);
    set("AZURE_CLIENT_ID")
        && set("AZURE_TENANT_ID")
        && (set("AZURE_CLIENT_SECRET") || set("AZURE_FEDERATED_TOKEN_FILE"))
}

impl Connector for ObjectStoreConnector {
    fn connect(&self, spec: &ConnectionSpec) -> StorageResult<Arc<dyn BlobServiceClient>> {
        let client_options = Self::build_client_options(&spec.transport, &spec.account_url)?;
        let builder =
            Self::build_azure_builder(spec, &client_options)?.with_client_options(client_options);

        // Surface configuration errors now rather than on first request.
        builder
            .clone()
            .with_container_name("$root")
            .build()
            .map_err(|e| {
                StorageError::InvalidConfig(format!("Failed to create Azure client: {}", e))
            })?;

        info!(
            "Created Azure client for account_url={}, credential={}",
            spec.account_url,
            spec.credential.kind()
        );

        let factory = move |container: &str| -> Result<Arc<dyn ObjectStore>, RemoteError> {
            let store = builder
                .clone()
                .with_container_name(container)
                .build()
                .map_err(remote_error)?;
            Ok(Arc::new(store))
        };
        Ok(Arc::new(ObjectStoreServiceClient::new(
            spec.account_url.clone(),
            Arc::new(factory),
        )))
    }
}

/// [`Connector`] handing out clients over one shared store.
///
/// Containers map to top-level prefixes of the store. Counts every connect.
#[derive(Debug)]
pub struct SharedStoreConnector {
    store: Arc<dyn ObjectStore>,
    connects: AtomicUsize,
}

impl SharedStoreConnector {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            connects: AtomicUsize::new(0),
        }
    }

    /// Number of clients built so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for SharedStoreConnector {
    fn connect(&self, spec: &ConnectionSpec) -> StorageResult<Arc<dyn BlobServiceClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ObjectStoreServiceClient::single_store(
            &spec.account_url,
            Arc::clone(&self.store),
        )))
    }
}

/// [`BlobServiceClient`] over `object_store`, one store per container.
pub struct ObjectStoreServiceClient {
    account_url: String,
    factory: Arc<StoreFactory>,
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl ObjectStoreServiceClient {
    pub fn new(account_url: impl Into<String>, factory: Arc<StoreFactory>) -> Self {
        Self {
            account_url: account_url.into(),
            factory,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Client where every container is a top-level prefix of `store`.
    pub fn single_store(account_url: &str, store: Arc<dyn ObjectStore>) -> Self {
        let factory = move |container: &str| -> Result<Arc<dyn ObjectStore>, RemoteError> {
            Ok(Arc::new(PrefixStore::new(Arc::clone(&store), container)))
        };
        Self::new(account_url, Arc::new(factory))
    }

    fn store(&self, container: &str) -> Result<Arc<dyn ObjectStore>, RemoteError> {
        let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(store) = stores.get(container) {
            return Ok(Arc::clone(store));
        }
        let store = (self.factory)(container)?;
        stores.insert(container.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

impl Debug for ObjectStoreServiceClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectStoreServiceClient(account_url={})", self.account_url)
    }
}

#[async_trait]
impl BlobServiceClient for ObjectStoreServiceClient {
    fn account_url(&self) -> &str {
        &self.account_url
    }

    fn blob_client(&self, container: &str, path: &str) -> Arc<dyn BlobClient> {
        Arc::new(ObjectStoreBlobClient {
            name: path.to_string(),
            location: object_path(path),
            store: self.store(container),
        })
    }

    /// One page of keys starting with `options.prefix`.
    ///
    /// The continuation token is the last key of the previous page; the next page
    /// lists strictly after it.
    ///
    /// `object_store` prefixes are whole path segments, so the request is made for
    /// the segments before the last `/` of `options.prefix` and the remainder is
    /// filtered here. A prefix without `/` (`da*` at the container root) lists the
    /// whole container.
    async fn list_blobs(
        &self,
        container: &str,
        options: &ListBlobsOptions,
    ) -> Result<ListBlobsPage, RemoteError> {
        let store = self.store(container)?;
        let prefix = options.prefix.clone().unwrap_or_default();
        let page_size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

        let parent = match prefix.rfind('/') {
            Some(idx) => Some(object_path(&prefix[..idx])?),
            None => None,
        };
        let listing = match &options.continuation_token {
            Some(token) => store.list_with_offset(parent.as_ref(), &object_path(token)?),
            None => store.list(parent.as_ref()),
        };

        let mut blobs: Vec<BlobItem> = listing
            .map_err(remote_error)
            .try_filter_map(|meta| {
                let name = meta.location.to_string();
                let item = name.starts_with(&prefix).then(|| BlobItem {
                    name,
                    size: meta.size,
                });
                futures::future::ready(Ok(item))
            })
            .take(page_size + 1)
            .try_collect()
            .await?;

        let next_page_token = if blobs.len() > page_size {
            blobs.truncate(page_size);
            blobs.last().map(|blob| blob.name.clone())
        } else {
            None
        };

        debug!(
            "Listed count={} blobs in container={} prefix={} more={}",
            blobs.len(),
            container,
            prefix,
            next_page_token.is_some()
        );
        Ok(ListBlobsPage {
            blobs,
            next_page_token,
        })
    }
}

struct ObjectStoreBlobClient {
    name: String,
    location: Result<ObjectPath, RemoteError>,
    store: Result<Arc<dyn ObjectStore>, RemoteError>,
}

impl ObjectStoreBlobClient {
    fn store(&self) -> Result<&Arc<dyn ObjectStore>, RemoteError> {
        self.store.as_ref().map_err(Clone::clone)
    }

    fn location(&self) -> Result<&ObjectPath, RemoteError> {
        self.location.as_ref().map_err(Clone::clone)
    }
}

#[async_trait]
impl BlobClient for ObjectStoreBlobClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn properties(&self) -> Result<BlobProperties, RemoteError> {
        let meta = self.store()?.head(self.location()?).await.map_err(remote_error)?;
        Ok(BlobProperties {
            size: meta.size,
            last_modified: Some(meta.last_modified),
        })
    }

    /// Download `[offset, offset + length)` in `chunk_size` pieces with at most
    /// `concurrency` requests in flight.
    async fn download_range(
        &self,
        offset: u64,
        length: u64,
        transfer: TransferOptions,
    ) -> Result<Bytes, RemoteError> {
        if length == 0 {
            return Ok(Bytes::new());
        }
        let store = self.store()?;
        let location = self.location()?;

        let chunks: Vec<Bytes> = stream::iter(chunk_ranges(offset, length, transfer.chunk_size))
            .map(|range| store.get_range(location, range))
            .buffered(transfer.concurrency.max(1))
            .map_err(remote_error)
            .try_collect()
            .await?;

        let data = if chunks.len() == 1 {
            chunks.into_iter().next().unwrap_or_default()
        } else {
            let mut data = BytesMut::with_capacity(length as usize);
            for chunk in chunks {
                data.extend_from_slice(&chunk);
            }
            data.freeze()
        };

        if data.len() as u64 != length {
            return Err(RemoteError::Other(format!(
                "Short read of '{}': expected {} bytes, got {}",
                self.name,
                length,
                data.len()
            )));
        }
        Ok(data)
    }
}

/// Split `[offset, offset + length)` into consecutive ranges of at most `chunk_size`.
fn chunk_ranges(offset: u64, length: u64, chunk_size: u64) -> Vec<Range<u64>> {
    let chunk_size = chunk_size.max(1);
    let end = offset + length;
    let mut ranges = Vec::new();
    let mut start = offset;
    while start < end {
        let stop = (start + chunk_size).min(end);
        ranges.push(start..stop);
        start = stop;
    }
    ranges
}

/// Object path for a blob name, taken verbatim.
///
/// Listed names are unencoded; lookups and offsets must use the same raw form.
fn object_path(name: &str) -> Result<ObjectPath, RemoteError> {
    ObjectPath::parse(name)
        .map_err(|e| RemoteError::InvalidPath(format!("'{}': {}", name, e)))
}

/// Map an `object_store` failure onto the service's error codes where one is known.
fn remote_error(error: object_store::Error) -> RemoteError {
    let (status, code, reason) = match &error {
        object_store::Error::NotFound { .. } => (404, "BlobNotFound", "Not Found"),
        object_store::Error::PermissionDenied { .. } => {
            (403, "AuthorizationPermissionMismatch", "Forbidden")
        }
        object_store::Error::Unauthenticated { .. } => {
            (401, "InvalidAuthenticationInfo", "Unauthorized")
        }
        _ => return RemoteError::Other(error.to_string()),
    };
    RemoteError::Service {
        status,
        code: code.to_string(),
        reason: reason.to_string(),
        message: error.to_string(),
    }
}
