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

//! The Azure blob virtual filesystem.
//!
//! [`AzureStorageFileSystem`] is the entry point: it opens blobs as
//! [`AzureFileHandle`]s, expands glob patterns by listing the container, and keeps
//! one connection context per account for the life of a session.

pub mod buffer;
pub mod handle;
pub mod url;

pub use handle::{AzureFileHandle, OpenFlags};
pub use url::ParsedUrl;

use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{debug, info};

use crate::storage::client::ListBlobsOptions;
use crate::storage::config::{self, parse_bool_setting};
use crate::storage::context::ConnectionContext;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::factory::{Connector, ContextFactory};
use crate::storage::object_store::ObjectStoreConnector;
use crate::storage::opener::FileOpener;
use crate::util::glob::GlobPattern;

/// Filesystem over `azure://` and `az://` URLs.
pub struct AzureStorageFileSystem {
    connector: Arc<dyn Connector>,
}

impl Default for AzureStorageFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for AzureStorageFileSystem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AzureStorageFileSystem(connector={:?})", self.connector)
    }
}

impl AzureStorageFileSystem {
    /// Filesystem talking to Azure through `object_store`.
    pub fn new() -> Self {
        Self::with_connector(Arc::new(ObjectStoreConnector::new()))
    }

    /// Filesystem building its clients through `connector`.
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    pub fn name(&self) -> &'static str {
        "AzureStorageFileSystem"
    }

    /// Whether `path` uses one of the handled schemes.
    pub fn can_handle_file(&self, path: &str) -> bool {
        url::SCHEMES.iter().any(|scheme| path.starts_with(scheme))
    }

    /// Connection context for the account in `parsed_url`.
    ///
    /// With `azure_context_caching` on (the default) and a session cache available,
    /// an active cached context is reused; a missing or retired one is rebuilt and
    /// replaces the entry. Otherwise a fresh context is built every time.
    pub fn get_or_create_context(
        &self,
        opener: &dyn FileOpener,
        path: &str,
        parsed_url: &ParsedUrl,
    ) -> StorageResult<Arc<ConnectionContext>> {
        let caching = parse_bool_setting(
            config::CONTEXT_CACHING,
            opener.setting(config::CONTEXT_CACHING).as_deref(),
        )?
        .unwrap_or(true);

        let cache = match opener.context_cache() {
            Some(cache) if caching => cache,
            _ => return ContextFactory::create(self.connector.as_ref(), opener, path, parsed_url),
        };

        let account = parsed_url.account.as_deref().unwrap_or("");
        if let Some(context) = cache.get(account) {
            return Ok(context);
        }

        let context = ContextFactory::create(self.connector.as_ref(), opener, path, parsed_url)?;
        cache.insert(account, Arc::clone(&context));
        Ok(context)
    }

    /// Open a blob for reading.
    ///
    /// # Errors
    ///
    /// * `NotSupported` - `flags.write` is set
    /// * `InvalidFormat` - `path` is not a valid blob URL
    /// * credential errors from resolving the connection
    /// * `Io` - the metadata fetch failed
    pub async fn open_file(
        &self,
        path: &str,
        flags: OpenFlags,
        opener: &dyn FileOpener,
    ) -> StorageResult<AzureFileHandle> {
        if flags.write {
            return Err(StorageError::NotSupported(
                "Writing to Azure containers is currently not supported".to_string(),
            ));
        }

        let parsed_url = ParsedUrl::parse(path)?;
        let context = self.get_or_create_context(opener, path, &parsed_url)?;
        let blob_client = context.blob_client(&parsed_url.container, &parsed_url.path)?;
        AzureFileHandle::open(path, flags, blob_client, *context.read_options()).await
    }

    /// Whether `path` can be opened and is non-empty.
    ///
    /// Any failure counts as missing, and so does a zero-length blob.
    pub async fn file_exists(&self, path: &str, opener: &dyn FileOpener) -> bool {
        match self.open_file(path, OpenFlags::READ, opener).await {
            Ok(handle) => handle.file_size() > 0,
            Err(e) => {
                debug!("file_exists treating path={} as missing: {}", path, e);
                false
            }
        }
    }

    pub fn file_sync(&self, _handle: &mut AzureFileHandle) -> StorageResult<()> {
        Err(StorageError::NotSupported(
            "FileSync for Azure Storage files not implemented".to_string(),
        ))
    }

    /// Expand a glob pattern into the matching blob URLs, in listing order.
    ///
    /// A path without `*`, `[` or `\` is returned as is without any request. Otherwise
    /// the container is listed with the text before the first wildcard as prefix, every
    /// page is drained and each key is matched against the whole pattern.
    ///
    /// # Errors
    ///
    /// Returns `Io` if any listing page fails or the service repeats a continuation
    /// token, or `InvalidFormat` if the listing prefix is not a valid object path; no
    /// partial result is returned.
    pub async fn glob(&self, path: &str, opener: &dyn FileOpener) -> StorageResult<Vec<String>> {
        let parsed_url = ParsedUrl::parse(path)?;
        let Some(first_wildcard) = parsed_url
            .path
            .find(|c: char| matches!(c, '*' | '[' | '\\'))
        else {
            return Ok(vec![path.to_string()]);
        };

        let context = self.get_or_create_context(opener, path, &parsed_url)?;
        let pattern = GlobPattern::new(&parsed_url.path);
        let mut options = ListBlobsOptions {
            prefix: Some(parsed_url.path[..first_wildcard].to_string()),
            ..Default::default()
        };

        let mut results = Vec::new();
        let mut seen_tokens = HashSet::new();
        loop {
            let page = context
                .service_client()
                .list_blobs(&parsed_url.container, &options)
                .await
                .map_err(|e| {
                    StorageError::from_remote(format!("AzureStorageFileSystem list of '{}'", path), e)
                })?;

            results.extend(
                page.blobs
                    .iter()
                    .filter(|blob| pattern.matches_key(&blob.name))
                    .map(|blob| parsed_url.url_for(&blob.name)),
            );

            match page.next_page_token {
                Some(token) => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(StorageError::io(format!(
                            "AzureStorageFileSystem list of '{}' returned continuation token '{}' twice",
                            path, token
                        )));
                    }
                    options.continuation_token = Some(token);
                }
                None => break,
            }
        }

        info!("Glob pattern={} matched count={}", path, results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::client::{
        BlobClient, BlobItem, BlobServiceClient, ListBlobsPage, RemoteError,
    };
    use crate::storage::config::Settings;
    use crate::storage::credentials::ConnectionSpec;
    use crate::storage::object_store::{ObjectStoreServiceClient, SharedStoreConnector};
    use crate::storage::opener::Session;
    use crate::storage::secret::KeyValueSecret;
    use async_trait::async_trait;
    use object_store::memory::InMemory;
    use object_store::path::Path as ObjectPath;
    use object_store::{ObjectStore, ObjectStoreExt, PutPayload};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    async fn store_with(blobs: &[(&str, &[u8])]) -> Arc<dyn ObjectStore> {
        let store = InMemory::new();
        for (name, data) in blobs {
            store
                .put(&ObjectPath::parse(*name).unwrap(), PutPayload::from(data.to_vec()))
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    async fn filesystem_with(
        blobs: &[(&str, &[u8])],
    ) -> (AzureStorageFileSystem, Arc<SharedStoreConnector>) {
        let connector = Arc::new(SharedStoreConnector::new(store_with(blobs).await));
        let fs = AzureStorageFileSystem::with_connector(connector.clone());
        (fs, connector)
    }

    fn session() -> Session {
        Session::new(
            Settings::new()
                .with_option(config::ACCOUNT_NAME, "acct")
                .with_option(config::HTTP_STATS, "true"),
        )
    }

    #[test]
    fn test_can_handle_file() {
        let fs = AzureStorageFileSystem::new();
        assert!(fs.can_handle_file("azure://container/file.csv"));
        assert!(fs.can_handle_file("az://acct.ep/container/file.csv"));
        assert!(!fs.can_handle_file("s3://bucket/file.csv"));
        assert!(!fs.can_handle_file("/local/az://file.csv"));
        assert_eq!(fs.name(), "AzureStorageFileSystem");
    }

    #[tokio::test]
    async fn test_open_and_read() {
        let (fs, _) = filesystem_with(&[("container/data/file.csv", b"a,b\n1,2\n")]).await;
        let session = session();

        let mut handle = fs
            .open_file("az://container/data/file.csv", OpenFlags::READ, &session)
            .await
            .unwrap();
        assert_eq!(handle.file_size(), 8);
        assert_eq!(handle.path(), "az://container/data/file.csv");

        let mut buf = vec![0u8; 32];
        let count = handle.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..count], b"a,b\n1,2\n");
    }

    #[tokio::test]
    async fn test_open_write_not_supported() {
        let (fs, connector) = filesystem_with(&[]).await;
        let result = fs
            .open_file("az://container/x.csv", OpenFlags::WRITE, &session())
            .await;
        assert!(matches!(result, Err(StorageError::NotSupported(_))));
        assert_eq!(connector.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_open_missing_blob_reports_code() {
        let (fs, _) = filesystem_with(&[]).await;
        match fs
            .open_file("az://container/missing.csv", OpenFlags::READ, &session())
            .await
        {
            Err(error) => {
                assert!(matches!(error, StorageError::Io { .. }));
                assert_eq!(error.code(), Some("BlobNotFound"));
            }
            Ok(_) => panic!("Expected open to fail"),
        }
    }

    #[tokio::test]
    async fn test_open_without_credentials() {
        let (fs, _) = filesystem_with(&[]).await;
        let session = Session::new(Settings::new());
        let result = fs
            .open_file("az://container/x.csv", OpenFlags::READ, &session)
            .await;
        assert!(matches!(result, Err(StorageError::MissingCredentials(_))));
    }

    #[tokio::test]
    async fn test_context_reused_within_session() {
        let (fs, connector) = filesystem_with(&[("container/a", b"1"), ("container/b", b"2")]).await;
        let session = session();
        let path = "az://acct.blob.core.windows.net/container/a";
        let parsed = ParsedUrl::parse(path).unwrap();

        let first = fs.get_or_create_context(&session, path, &parsed).unwrap();
        let second = fs.get_or_create_context(&session, path, &parsed).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        fs.open_file(path, OpenFlags::READ, &session).await.unwrap();
        fs.open_file("az://acct.blob.core.windows.net/container/b", OpenFlags::READ, &session)
            .await
            .unwrap();
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_session_end_forces_new_context() {
        let (fs, connector) = filesystem_with(&[("container/a", b"1")]).await;
        let session = session();
        let path = "az://container/a";
        let parsed = ParsedUrl::parse(path).unwrap();

        let first = fs.get_or_create_context(&session, path, &parsed).unwrap();
        let mut handle = fs.open_file(path, OpenFlags::READ, &session).await.unwrap();
        session.end();

        let second = fs.get_or_create_context(&session, path, &parsed).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!first.is_active());
        assert!(second.is_active());
        assert_eq!(connector.connect_count(), 2);

        // handles opened before the session ended keep reading
        let mut buf = [0u8; 1];
        assert_eq!(handle.read(&mut buf).await.unwrap(), 1);
        assert_eq!(&buf, b"1");
    }

    #[tokio::test]
    async fn test_caching_disabled_builds_every_time() {
        let (fs, connector) = filesystem_with(&[("container/a", b"1")]).await;
        let session = Session::new(
            Settings::new()
                .with_option(config::ACCOUNT_NAME, "acct")
                .with_option(config::CONTEXT_CACHING, "false"),
        );
        let path = "az://container/a";
        let parsed = ParsedUrl::parse(path).unwrap();

        let first = fs.get_or_create_context(&session, path, &parsed).unwrap();
        let second = fs.get_or_create_context(&session, path, &parsed).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_contexts_keyed_by_account() {
        let (fs, connector) = filesystem_with(&[]).await;
        let session = session();

        for path in [
            "az://one.blob.core.windows.net/container/x",
            "az://two.blob.core.windows.net/container/x",
            "az://container/x",
            "az://one.blob.core.windows.net/other/y",
        ] {
            let parsed = ParsedUrl::parse(path).unwrap();
            fs.get_or_create_context(&session, path, &parsed).unwrap();
        }
        assert_eq!(connector.connect_count(), 3);
    }

    #[tokio::test]
    async fn test_context_uses_session_read_options() {
        let (fs, _) = filesystem_with(&[("container/a", b"1")]).await;
        let session = Session::new(
            Settings::new()
                .with_option(config::ACCOUNT_NAME, "acct")
                .with_option(config::READ_BUFFER_SIZE, "4096")
                .with_option(config::READ_TRANSFER_CONCURRENCY, "2"),
        );

        let handle = fs
            .open_file("az://container/a", OpenFlags::READ, &session)
            .await
            .unwrap();
        assert_eq!(handle.read_options().buffer_size, 4096);
        assert_eq!(handle.read_options().transfer_concurrency, 2);
    }

    #[tokio::test]
    async fn test_invalid_caching_setting() {
        let (fs, _) = filesystem_with(&[]).await;
        let session = Session::new(Settings::new().with_option(config::CONTEXT_CACHING, "sometimes"));
        let path = "az://container/a";
        let parsed = ParsedUrl::parse(path).unwrap();
        assert!(matches!(
            fs.get_or_create_context(&session, path, &parsed),
            Err(StorageError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_secret_used_for_context() {
        let (fs, _) = filesystem_with(&[("container/a", b"1")]).await;
        let session = Session::new(Settings::new());
        session.secrets().register(
            KeyValueSecret::azure("sp", "service_principal")
                .with_value("tenant_id", "t")
                .with_value("client_id", "c")
                .with_value("account_name", "fromsecret"),
        );

        let result = fs
            .open_file("az://container/a", OpenFlags::READ, &session)
            .await;
        assert!(matches!(result, Err(StorageError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_http_stats_recorded_when_enabled() {
        let (fs, _) = filesystem_with(&[("container/a", b"hello")]).await;
        let session = session();

        let mut handle = fs
            .open_file("az://container/a", OpenFlags::READ, &session)
            .await
            .unwrap();
        let mut buf = [0u8; 5];
        handle.read(&mut buf).await.unwrap();

        let snapshot = session.stats().snapshot();
        assert_eq!(snapshot.head_count, 1);
        assert_eq!(snapshot.get_count, 1);
        assert_eq!(snapshot.bytes_received, 5);
    }

    #[tokio::test]
    async fn test_http_stats_off_by_default() {
        let (fs, _) = filesystem_with(&[("container/a", b"hello")]).await;
        let session = Session::new(Settings::new().with_option(config::ACCOUNT_NAME, "acct"));

        fs.open_file("az://container/a", OpenFlags::READ, &session)
            .await
            .unwrap();
        assert_eq!(session.stats().snapshot().head_count, 0);
    }

    #[tokio::test]
    async fn test_file_exists() {
        let (fs, _) = filesystem_with(&[("container/full", b"data"), ("container/empty", b"")]).await;
        let session = session();

        assert!(fs.file_exists("az://container/full", &session).await);
        assert!(!fs.file_exists("az://container/empty", &session).await);
        assert!(!fs.file_exists("az://container/missing", &session).await);
        assert!(!fs.file_exists("s3://bucket/full", &session).await);
    }

    #[tokio::test]
    async fn test_file_sync_not_supported() {
        let (fs, _) = filesystem_with(&[("container/a", b"1")]).await;
        let mut handle = fs
            .open_file("az://container/a", OpenFlags::READ, &session())
            .await
            .unwrap();
        assert!(matches!(
            fs.file_sync(&mut handle),
            Err(StorageError::NotSupported(_))
        ));
    }

    #[tokio::test]
    async fn test_glob_without_wildcard_does_no_io() {
        let (fs, connector) = filesystem_with(&[]).await;
        let session = session();

        let path = "az://acct.ep/container/data/file.csv";
        let result = fs.glob(path, &session).await.unwrap();
        assert_eq!(result, vec![path.to_string()]);
        assert_eq!(connector.connect_count(), 0);
        assert_eq!(session.stats().snapshot().list_count, 0);
    }

    #[tokio::test]
    async fn test_glob_recursive_csv() {
        let (fs, _) = filesystem_with(&[
            ("container/data/a/x.csv", b"1"),
            ("container/data/a/x.parquet", b"2"),
            ("container/data/b/c/y.csv", b"3"),
            ("container/other/z.csv", b"4"),
        ])
        .await;
        let session = session();

        let result = fs
            .glob("az://acct.ep/container/data/**/*.csv", &session)
            .await
            .unwrap();
        assert_eq!(
            result,
            vec![
                "az://acct.ep/container/data/a/x.csv".to_string(),
                "az://acct.ep/container/data/b/c/y.csv".to_string(),
            ]
        );
        assert_eq!(session.stats().snapshot().list_count, 1);
    }

    #[tokio::test]
    async fn test_glob_container_form_keeps_scheme() {
        let (fs, _) = filesystem_with(&[
            ("container/logs/2024-01.json", b"1"),
            ("container/logs/2024-02.json", b"2"),
            ("container/logs/2025-01.json", b"3"),
        ])
        .await;

        let result = fs
            .glob("azure://container/logs/2024-*.json", &session())
            .await
            .unwrap();
        assert_eq!(
            result,
            vec![
                "azure://container/logs/2024-01.json".to_string(),
                "azure://container/logs/2024-02.json".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_glob_results_open_with_reserved_characters() {
        let (fs, _) = filesystem_with(&[
            ("container/data/file[1].csv", b"bracket"),
            ("container/data/50%.csv", b"percent"),
            ("container/data/a b.csv", b"space"),
        ])
        .await;
        let session = session();

        let paths = fs.glob("az://container/data/*.csv", &session).await.unwrap();
        assert_eq!(
            paths,
            vec![
                "az://container/data/50%.csv",
                "az://container/data/a b.csv",
                "az://container/data/file[1].csv",
            ]
        );

        for (path, expected) in paths.iter().zip([&b"percent"[..], b"space", b"bracket"]) {
            let mut handle = fs.open_file(path, OpenFlags::READ, &session).await.unwrap();
            let mut buf = vec![0u8; handle.file_size() as usize];
            handle.read_at(&mut buf, 0).await.unwrap();
            assert_eq!(&buf[..], expected);
        }
    }

    #[tokio::test]
    async fn test_glob_prefix_with_reserved_characters() {
        let (fs, _) = filesystem_with(&[
            ("container/50%/a.csv", b"1"),
            ("container/50%/b.json", b"2"),
            ("container/other/c.csv", b"3"),
        ])
        .await;

        let paths = fs.glob("az://container/50%/*.csv", &session()).await.unwrap();
        assert_eq!(paths, vec!["az://container/50%/a.csv"]);
    }

    #[tokio::test]
    async fn test_open_invalid_blob_path() {
        let (fs, _) = filesystem_with(&[]).await;
        let result = fs
            .open_file("az://container/data//file.csv", OpenFlags::READ, &session())
            .await;
        assert!(matches!(result, Err(StorageError::InvalidFormat(_))));
    }

    #[tokio::test]
    async fn test_glob_invalid_url() {
        let (fs, _) = filesystem_with(&[]).await;
        assert!(matches!(
            fs.glob("az://container", &session()).await,
            Err(StorageError::InvalidFormat(_))
        ));
    }

    /// Service client that serves scripted listing pages in order.
    #[derive(Debug)]
    struct ScriptedClient {
        pages: Vec<Result<ListBlobsPage, RemoteError>>,
        calls: AtomicUsize,
        requests: Mutex<Vec<(Option<String>, Option<String>)>>,
        fallback: ObjectStoreServiceClient,
    }

    #[async_trait]
    impl BlobServiceClient for ScriptedClient {
        fn account_url(&self) -> &str {
            "https://acct.blob.core.windows.net"
        }

        fn blob_client(&self, container: &str, path: &str) -> Arc<dyn BlobClient> {
            self.fallback.blob_client(container, path)
        }

        async fn list_blobs(
            &self,
            _container: &str,
            options: &ListBlobsOptions,
        ) -> Result<ListBlobsPage, RemoteError> {
            self.requests.lock().unwrap().push((
                options.prefix.clone(),
                options.continuation_token.clone(),
            ));
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .get(call)
                .cloned()
                .unwrap_or_else(|| Err(RemoteError::Other("no more pages".to_string())))
        }
    }

    #[derive(Debug)]
    struct ScriptedConnector {
        client: Arc<ScriptedClient>,
    }

    impl Connector for ScriptedConnector {
        fn connect(&self, _spec: &ConnectionSpec) -> StorageResult<Arc<dyn BlobServiceClient>> {
            Ok(self.client.clone())
        }
    }

    async fn scripted(
        pages: Vec<Result<ListBlobsPage, RemoteError>>,
    ) -> (AzureStorageFileSystem, Arc<ScriptedClient>) {
        let client = Arc::new(ScriptedClient {
            pages,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            fallback: ObjectStoreServiceClient::single_store(
                "https://acct.blob.core.windows.net",
                store_with(&[]).await,
            ),
        });
        let fs = AzureStorageFileSystem::with_connector(Arc::new(ScriptedConnector {
            client: Arc::clone(&client),
        }));
        (fs, client)
    }

    fn page(names: &[&str], token: Option<&str>) -> Result<ListBlobsPage, RemoteError> {
        Ok(ListBlobsPage {
            blobs: names
                .iter()
                .map(|name| BlobItem {
                    name: name.to_string(),
                    size: 1,
                })
                .collect(),
            next_page_token: token.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_glob_drains_all_pages() {
        let (fs, client) = scripted(vec![
            page(&["data/1.csv", "data/1.txt"], Some("t1")),
            page(&["data/2.csv"], Some("t2")),
            page(&["data/3.csv"], None),
        ])
        .await;

        let result = fs.glob("az://container/data/*.csv", &session()).await.unwrap();
        assert_eq!(
            result,
            vec![
                "az://container/data/1.csv".to_string(),
                "az://container/data/2.csv".to_string(),
                "az://container/data/3.csv".to_string(),
            ]
        );
        let tokens: Vec<Option<String>> = client
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, token)| token.clone())
            .collect();
        assert_eq!(tokens, vec![None, Some("t1".to_string()), Some("t2".to_string())]);
    }

    #[tokio::test]
    async fn test_glob_failure_mid_pagination() {
        let (fs, _) = scripted(vec![
            page(&["data/1.csv"], Some("t1")),
            Err(RemoteError::Service {
                status: 403,
                code: "AuthorizationFailure".to_string(),
                reason: "Forbidden".to_string(),
                message: "denied".to_string(),
            }),
        ])
        .await;

        match fs.glob("az://container/data/*.csv", &session()).await {
            Err(error) => assert_eq!(error.code(), Some("AuthorizationFailure")),
            Ok(result) => panic!("Expected failure, got {:?}", result),
        }
    }

    #[tokio::test]
    async fn test_glob_repeated_token_aborts() {
        let (fs, _) = scripted(vec![
            page(&["data/1.csv"], Some("same")),
            page(&["data/2.csv"], Some("same")),
        ])
        .await;

        assert!(matches!(
            fs.glob("az://container/data/*.csv", &session()).await,
            Err(StorageError::Io { .. })
        ));
    }

    #[tokio::test]
    async fn test_glob_lists_with_text_before_first_wildcard() {
        let (fs, client) = scripted(vec![page(&["data/sub/1.csv", "data/sud/2.csv"], None)]).await;

        let result = fs
            .glob("az://container/data/su[bc]/*.csv", &session())
            .await
            .unwrap();
        assert_eq!(result, vec!["az://container/data/sub/1.csv".to_string()]);
        assert_eq!(
            client.requests.lock().unwrap()[0],
            (Some("data/su".to_string()), None)
        );
    }
}
