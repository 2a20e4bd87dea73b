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

//! Credential resolution.
//!
//! Picks how to authenticate against a storage account. A registered secret
//! matching the path always wins; otherwise the session settings are used.
//! The result is a [`ConnectionSpec`] that a [`super::factory::Connector`]
//! turns into a live client.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::config;
use super::error::{StorageError, StorageResult};
use super::opener::FileOpener;
use super::secret::{KeyValueSecret, AZURE_SECRET_TYPE};
use crate::filesystem::url::ParsedUrl;

/// Blob endpoint suffix used when neither the URL, the secret nor the settings name one.
pub const DEFAULT_ENDPOINT: &str = "blob.core.windows.net";

/// Well-known CA bundle locations, probed in order.
#[cfg(all(unix, not(target_os = "macos")))]
pub const CA_BUNDLE_CANDIDATES: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt",
    "/etc/pki/tls/certs/ca-bundle.crt",
    "/etc/ssl/ca-bundle.pem",
    "/etc/pki/tls/cacert.pem",
    "/etc/pki/ca-trust/extracted/pem/tls-ca-bundle.pem",
    "/etc/ssl/cert.pem",
];

/// Well-known CA bundle locations, probed in order.
#[cfg(not(all(unix, not(target_os = "macos"))))]
pub const CA_BUNDLE_CANDIDATES: &[&str] = &[];

/// One link of a chained token credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainSource {
    Cli,
    ManagedIdentity,
    Env,
    Default,
}

/// Parse a `;`-separated credential chain such as `cli;managed_identity`.
///
/// # Errors
///
/// Returns `InvalidConfig` for an unknown strategy name or an empty chain.
pub fn parse_chain(chain: &str) -> StorageResult<Vec<ChainSource>> {
    let sources = chain
        .split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item {
            "cli" => Ok(ChainSource::Cli),
            "managed_identity" => Ok(ChainSource::ManagedIdentity),
            "env" => Ok(ChainSource::Env),
            "default" => Ok(ChainSource::Default),
            other => Err(StorageError::InvalidConfig(format!(
                "Unknown credential provider found: {}",
                other
            ))),
        })
        .collect::<StorageResult<Vec<_>>>()?;

    if sources.is_empty() {
        return Err(StorageError::InvalidConfig(
            "Credential chain must name at least one provider".to_string(),
        ));
    }
    Ok(sources)
}

/// A parsed storage connection string (`Key=Value;Key=Value`).
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pairs: Vec<(String, String)>,
}

impl ConnectionString {
    pub fn parse(raw: &str) -> Self {
        let pairs = raw
            .split(';')
            .filter_map(|part| {
                let (key, value) = part.split_once('=')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
            })
            .collect();
        Self { pairs }
    }

    /// Value for `key`, compared case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn account_name(&self) -> Option<&str> {
        self.get("AccountName")
    }

    pub fn account_key(&self) -> Option<&str> {
        self.get("AccountKey")
    }

    pub fn shared_access_signature(&self) -> Option<&str> {
        self.get("SharedAccessSignature")
    }

    pub fn use_development_storage(&self) -> bool {
        self.get("UseDevelopmentStorage")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Blob endpoint URL described by the connection string.
    pub fn blob_endpoint(&self) -> Option<String> {
        if let Some(endpoint) = self.get("BlobEndpoint") {
            return Some(endpoint.trim_end_matches('/').to_string());
        }
        if self.use_development_storage() {
            return Some("http://127.0.0.1:10000/devstoreaccount1".to_string());
        }
        let account = self.account_name()?;
        let protocol = self.get("DefaultEndpointsProtocol").unwrap_or("https");
        let suffix = self.get("EndpointSuffix").unwrap_or("core.windows.net");
        Some(format!("{}://{}.blob.{}", protocol, account, suffix))
    }

    /// Whether the connection string belongs to `provided_account`.
    ///
    /// An empty `provided_account` always matches.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` when an account is requested but the connection
    /// string carries no `AccountName`.
    pub fn matches_account(&self, provided_account: &str) -> StorageResult<bool> {
        if provided_account.is_empty() {
            return Ok(true);
        }
        match self.account_name() {
            Some(account) => Ok(account == provided_account),
            None => Err(StorageError::InvalidConfig(
                "An invalid connection string has been provided.".to_string(),
            )),
        }
    }
}

impl Debug for ConnectionString {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ConnectionString")
            .field("account_name", &self.account_name())
            .field("blob_endpoint", &self.blob_endpoint())
            .finish()
    }
}

/// How the client authenticates
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    ConnectionString(ConnectionString),
    Anonymous,
    Chain(Vec<ChainSource>),
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    ClientCertificate {
        tenant_id: String,
        client_id: String,
        certificate_path: PathBuf,
    },
}

impl Credential {
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::ConnectionString(_) => "connection_string",
            Credential::Anonymous => "anonymous",
            Credential::Chain(_) => "credential_chain",
            Credential::ClientSecret { .. } => "client_secret",
            Credential::ClientCertificate { .. } => "client_certificate",
        }
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Credential::ConnectionString(cs) => f.debug_tuple("ConnectionString").field(cs).finish(),
            Credential::Anonymous => write!(f, "Anonymous"),
            Credential::Chain(sources) => f.debug_tuple("Chain").field(sources).finish(),
            Credential::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            Credential::ClientCertificate {
                tenant_id,
                client_id,
                certificate_path,
            } => f
                .debug_struct("ClientCertificate")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .field("certificate_path", certificate_path)
                .finish(),
        }
    }
}

/// HTTP transport implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Default,
    Curl,
}

impl TransportKind {
    fn parse(value: Option<&str>) -> StorageResult<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("default") => Ok(TransportKind::Default),
            Some("curl") => Ok(TransportKind::Curl),
            Some(other) => Err(StorageError::InvalidConfig(format!(
                "transport_option_type cannot take value '{}'",
                other
            ))),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ProxyOptions {
    pub host: String,
    pub user_name: Option<String>,
    pub password: Option<String>,
}

impl Debug for ProxyOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ProxyOptions")
            .field("host", &self.host)
            .field("user_name", &self.user_name)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Network transport settings attached to every client of one connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub kind: TransportKind,
    pub proxy: Option<ProxyOptions>,
    pub ca_info: Option<PathBuf>,
    pub ca_path: Option<PathBuf>,
}

/// Everything needed to build an authenticated account client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub account_name: String,
    pub account_url: String,
    pub credential: Credential,
    pub transport: TransportOptions,
}

/// Service principal authentication material
#[derive(Clone, PartialEq, Eq)]
pub enum ClientAuth {
    Secret(String),
    Certificate(PathBuf),
}

/// Provider-specific view of an Azure secret.
///
/// Each variant carries only what its construction path needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AzureSecret {
    Config {
        connection_string: Option<ConnectionString>,
    },
    CredentialChain {
        chain: Vec<ChainSource>,
    },
    ServicePrincipal {
        tenant_id: String,
        client_id: String,
        auth: ClientAuth,
    },
}

impl Debug for ClientAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ClientAuth::Secret(_) => write!(f, "Secret(***)"),
            ClientAuth::Certificate(path) => f.debug_tuple("Certificate").field(path).finish(),
        }
    }
}

impl AzureSecret {
    /// Interpret a registered secret according to its provider kind.
    ///
    /// # Errors
    ///
    /// * `UnsupportedProvider` - provider is not `config`, `credential_chain` or `service_principal`
    /// * `MissingField` - a service principal lacks `tenant_id` or `client_id`
    /// * `InvalidConfig` - a service principal has neither `client_secret` nor
    ///   `client_certificate_path`, or the chain names an unknown strategy
    pub fn from_secret(secret: &KeyValueSecret) -> StorageResult<Self> {
        match secret.provider.as_str() {
            "config" => Ok(AzureSecret::Config {
                connection_string: secret.get("connection_string").map(ConnectionString::parse),
            }),
            "credential_chain" => Ok(AzureSecret::CredentialChain {
                chain: parse_chain(secret.get("chain").unwrap_or("default"))?,
            }),
            "service_principal" => {
                let tenant_id = required(secret, "tenant_id")?;
                let client_id = required(secret, "client_id")?;
                let auth = if let Some(client_secret) = secret.get("client_secret") {
                    ClientAuth::Secret(client_secret.to_string())
                } else if let Some(path) = secret.get("client_certificate_path") {
                    ClientAuth::Certificate(PathBuf::from(path))
                } else {
                    return Err(StorageError::InvalidConfig(format!(
                        "Failed to fetch key 'client_secret' or 'client_certificate_path' from secret '{}' of type 'azure'",
                        secret.name
                    )));
                };
                Ok(AzureSecret::ServicePrincipal {
                    tenant_id,
                    client_id,
                    auth,
                })
            }
            other => Err(StorageError::UnsupportedProvider(format!(
                "Unsupported provider type {} for azure",
                other
            ))),
        }
    }
}

fn required(secret: &KeyValueSecret, key: &str) -> StorageResult<String> {
    secret.get(key).map(str::to_string).ok_or_else(|| {
        StorageError::MissingField(format!(
            "Failed to fetch key '{}' from secret '{}' of type 'azure'",
            key, secret.name
        ))
    })
}

/// Resolve how to connect for `path`.
///
/// # Arguments
///
/// * `opener` - Session collaborator providing settings and secrets
/// * `path` - Full URL being accessed, used for secret scope matching
/// * `parsed_url` - Parsed form of `path`
pub fn resolve(
    opener: &dyn FileOpener,
    path: &str,
    parsed_url: &ParsedUrl,
) -> StorageResult<ConnectionSpec> {
    let provided_account = parsed_url.account.as_deref().unwrap_or("");
    let provided_endpoint = parsed_url.endpoint.as_deref().unwrap_or("");

    match opener.lookup_secret(path, AZURE_SECRET_TYPE) {
        Some(secret) => {
            info!(
                "Resolving credentials from secret name={}, provider={}",
                secret.name, secret.provider
            );
            resolve_from_secret(opener, &secret, provided_account, provided_endpoint)
        }
        None => {
            debug!("No azure secret matched path={}, using settings", path);
            resolve_from_settings(opener, provided_account, provided_endpoint)
        }
    }
}

fn resolve_from_secret(
    opener: &dyn FileOpener,
    secret: &KeyValueSecret,
    provided_account: &str,
    provided_endpoint: &str,
) -> StorageResult<ConnectionSpec> {
    let azure_secret = AzureSecret::from_secret(secret)?;
    let transport = resolve_transport(opener, Some(secret))?;

    if let AzureSecret::Config {
        connection_string: Some(connection_string),
    } = &azure_secret
    {
        if !connection_string.matches_account(provided_account)? {
            return Err(StorageError::InvalidCredentials(format!(
                "The provided connection string does not match the storage account named {}",
                provided_account
            )));
        }
        return connection_string_spec(connection_string.clone(), transport);
    }

    let account_name = if provided_account.is_empty() {
        required(secret, "account_name")?
    } else {
        provided_account.to_string()
    };
    let endpoint = if provided_endpoint.is_empty() {
        secret.get("endpoint").unwrap_or(DEFAULT_ENDPOINT).to_string()
    } else {
        provided_endpoint.to_string()
    };

    let credential = match azure_secret {
        AzureSecret::Config { .. } => Credential::Anonymous,
        AzureSecret::CredentialChain { chain } => Credential::Chain(chain),
        AzureSecret::ServicePrincipal {
            tenant_id,
            client_id,
            auth: ClientAuth::Secret(client_secret),
        } => Credential::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        },
        AzureSecret::ServicePrincipal {
            tenant_id,
            client_id,
            auth: ClientAuth::Certificate(certificate_path),
        } => Credential::ClientCertificate {
            tenant_id,
            client_id,
            certificate_path,
        },
    };

    Ok(ConnectionSpec {
        account_url: account_url(&account_name, &endpoint),
        account_name,
        credential,
        transport,
    })
}

fn resolve_from_settings(
    opener: &dyn FileOpener,
    provided_account: &str,
    provided_endpoint: &str,
) -> StorageResult<ConnectionSpec> {
    let transport = resolve_transport(opener, None)?;

    if let Some(raw) = non_empty(opener.setting(config::STORAGE_CONNECTION_STRING)) {
        let connection_string = ConnectionString::parse(&raw);
        if connection_string.matches_account(provided_account)? {
            return connection_string_spec(connection_string, transport);
        }
        warn!(
            "Connection string setting does not match account={}, skipping it",
            provided_account
        );
    }

    let endpoint = if provided_endpoint.is_empty() {
        non_empty(opener.setting(config::ENDPOINT)).unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    } else {
        provided_endpoint.to_string()
    };
    let account_name = if provided_account.is_empty() {
        non_empty(opener.setting(config::ACCOUNT_NAME)).ok_or_else(|| {
            StorageError::MissingCredentials("No valid Azure credentials found!".to_string())
        })?
    } else {
        provided_account.to_string()
    };

    let credential = match non_empty(opener.setting(config::CREDENTIAL_CHAIN)) {
        Some(chain) => Credential::Chain(parse_chain(&chain)?),
        None => Credential::Anonymous,
    };

    Ok(ConnectionSpec {
        account_url: account_url(&account_name, &endpoint),
        account_name,
        credential,
        transport,
    })
}

fn connection_string_spec(
    connection_string: ConnectionString,
    transport: TransportOptions,
) -> StorageResult<ConnectionSpec> {
    let account_url = connection_string.blob_endpoint().ok_or_else(|| {
        StorageError::InvalidConfig("An invalid connection string has been provided.".to_string())
    })?;
    let account_name = if connection_string.use_development_storage() {
        "devstoreaccount1".to_string()
    } else {
        connection_string.account_name().unwrap_or_default().to_string()
    };

    Ok(ConnectionSpec {
        account_name,
        account_url,
        credential: Credential::ConnectionString(connection_string),
        transport,
    })
}

fn account_url(account_name: &str, endpoint: &str) -> String {
    format!("https://{}.{}", account_name, endpoint)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve transport options, preferring the secret's proxy fields over the settings.
pub fn resolve_transport(
    opener: &dyn FileOpener,
    secret: Option<&KeyValueSecret>,
) -> StorageResult<TransportOptions> {
    let kind = TransportKind::parse(opener.setting(config::TRANSPORT_OPTION_TYPE).as_deref())?;

    let pick = |secret_key: &str, setting_key: &str| -> Option<String> {
        secret
            .and_then(|s| s.get(secret_key))
            .map(str::to_string)
            .or_else(|| non_empty(opener.setting(setting_key)))
    };

    let proxy_host = pick("http_proxy", config::HTTP_PROXY)
        .or_else(|| non_empty(std::env::var("HTTP_PROXY").ok()));
    let proxy = proxy_host.map(|host| ProxyOptions {
        host,
        user_name: pick("proxy_user_name", config::PROXY_USER_NAME),
        password: pick("proxy_password", config::PROXY_PASSWORD),
    });

    let (ca_info, ca_path) = match kind {
        TransportKind::Default => (None, None),
        TransportKind::Curl => (
            discover_ca_bundle(
                non_empty(std::env::var("CURL_CA_INFO").ok()).map(PathBuf::from),
                CA_BUNDLE_CANDIDATES,
            ),
            non_empty(std::env::var("CURL_CA_PATH").ok()).map(PathBuf::from),
        ),
    };

    Ok(TransportOptions {
        kind,
        proxy,
        ca_info,
        ca_path,
    })
}

/// Pick the CA bundle: an explicit override, else the first candidate file that exists.
pub fn discover_ca_bundle(explicit: Option<PathBuf>, candidates: &[&str]) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }
    candidates
        .iter()
        .map(Path::new)
        .find(|path| path.is_file())
        .map(Path::to_path_buf)
}
