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

//! Token providers plugged into the Azure client.
//!
//! [`ChainedCredential`] tries a list of sources in order at token time.
//! [`ClientCertificateCredential`] signs a client assertion with a certificate's
//! private key and exchanges it for a storage token.

use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use object_store::azure::{AzureCredential, AzureCredentialProvider};
use object_store::CredentialProvider;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt::{Debug, Formatter};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::credentials::ChainSource;
use super::error::{StorageError, StorageResult};

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";
const STORAGE_SCOPE: &str = "https://storage.azure.com/.default";
const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::from_secs(600);
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

fn generic_error(
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> object_store::Error {
    object_store::Error::Generic {
        store: "MicrosoftAzure",
        source: source.into(),
    }
}

/// Ordered token sources, tried until one yields a credential.
///
/// The source that succeeded last is asked first on later calls; the others
/// follow in their configured order.
#[derive(Debug)]
pub struct ChainedCredential {
    sources: Vec<(ChainSource, AzureCredentialProvider)>,
    preferred: AtomicUsize,
}

impl ChainedCredential {
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `sources` is empty.
    pub fn new(sources: Vec<(ChainSource, AzureCredentialProvider)>) -> StorageResult<Self> {
        if sources.is_empty() {
            return Err(StorageError::InvalidConfig(
                "Credential chain has no usable source".to_string(),
            ));
        }
        Ok(Self {
            sources,
            preferred: AtomicUsize::new(0),
        })
    }

    pub fn sources(&self) -> impl Iterator<Item = ChainSource> + '_ {
        self.sources.iter().map(|(source, _)| *source)
    }
}

#[async_trait]
impl CredentialProvider for ChainedCredential {
    type Credential = AzureCredential;

    async fn get_credential(&self) -> object_store::Result<Arc<AzureCredential>> {
        let preferred = self.preferred.load(Ordering::Relaxed);
        let order = std::iter::once(preferred)
            .chain((0..self.sources.len()).filter(move |idx| *idx != preferred));

        let mut failures = Vec::new();
        for idx in order {
            let (source, provider) = &self.sources[idx];
            match provider.get_credential().await {
                Ok(credential) => {
                    if idx != preferred {
                        debug!("Credential chain switched to source={:?}", source);
                        self.preferred.store(idx, Ordering::Relaxed);
                    }
                    return Ok(credential);
                }
                Err(e) => {
                    debug!("Credential source={:?} failed: {}", source, e);
                    failures.push(format!("{:?}: {}", source, e));
                }
            }
        }

        Err(generic_error(format!(
            "No credential in the chain succeeded: {}",
            failures.join("; ")
        )))
    }
}

/// Certificate thumbprint and RSA signing key from a PEM bundle.
struct ClientCertificate {
    /// base64url SHA-1 of the DER certificate, sent as `x5t`
    thumbprint: String,
    key: EncodingKey,
}

impl ClientCertificate {
    fn from_pem(pem: &str) -> Result<Self, String> {
        let certificate = pem_section(pem, "CERTIFICATE")
            .ok_or_else(|| "no CERTIFICATE block found".to_string())?;
        let body: String = certificate
            .lines()
            .filter(|line| !line.starts_with("-----"))
            .flat_map(|line| line.chars().filter(|c| !c.is_whitespace()))
            .collect();
        let der = STANDARD
            .decode(body)
            .map_err(|e| format!("certificate is not valid base64: {}", e))?;

        let key = ["PRIVATE KEY", "RSA PRIVATE KEY"]
            .iter()
            .find_map(|label| pem_section(pem, label))
            .ok_or_else(|| "no unencrypted RSA private key found".to_string())?;
        let key = EncodingKey::from_rsa_pem(key.as_bytes())
            .map_err(|e| format!("private key is not a valid RSA key: {}", e))?;

        Ok(Self {
            thumbprint: URL_SAFE_NO_PAD.encode(Sha1::digest(&der)),
            key,
        })
    }
}

/// The `-----BEGIN <label>-----` section of `pem`, markers included.
fn pem_section<'a>(pem: &'a str, label: &str) -> Option<&'a str> {
    let begin = format!("-----BEGIN {}-----", label);
    let end = format!("-----END {}-----", label);
    let start = pem.find(&begin)?;
    let stop = start + pem[start..].find(&end)? + end.len();
    Some(&pem[start..stop])
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    aud: String,
    iss: String,
    sub: String,
    jti: String,
    nbf: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    credential: Arc<AzureCredential>,
    expires_at: Instant,
}

/// Service principal authenticated with a client certificate.
///
/// The PEM file must hold the certificate and its unencrypted RSA private key.
/// Tokens are cached until five minutes before they expire.
pub struct ClientCertificateCredential {
    tenant_id: String,
    client_id: String,
    authority_host: String,
    certificate: ClientCertificate,
    client: reqwest::Client,
    cache: Mutex<Option<CachedToken>>,
}

impl Debug for ClientCertificateCredential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCertificateCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("authority_host", &self.authority_host)
            .field("thumbprint", &self.certificate.thumbprint)
            .finish()
    }
}

impl ClientCertificateCredential {
    /// Load the certificate at `certificate_path`.
    ///
    /// The authority host comes from `AZURE_AUTHORITY_HOST` when set.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read, lacks a certificate or
    /// an RSA key, or the proxy URL is rejected.
    pub fn new(
        tenant_id: &str,
        client_id: &str,
        certificate_path: &Path,
        proxy_url: Option<&str>,
    ) -> StorageResult<Self> {
        let pem = std::fs::read_to_string(certificate_path).map_err(|e| {
            StorageError::InvalidConfig(format!(
                "Failed to read client certificate '{}': {}",
                certificate_path.display(),
                e
            ))
        })?;
        let certificate = ClientCertificate::from_pem(&pem).map_err(|e| {
            StorageError::InvalidConfig(format!(
                "Invalid client certificate '{}': {}",
                certificate_path.display(),
                e
            ))
        })?;

        let mut builder = reqwest::Client::builder();
        builder = match proxy_url {
            Some(url) => builder.proxy(reqwest::Proxy::all(url).map_err(|e| {
                StorageError::InvalidConfig(format!("Invalid proxy for token requests: {}", e))
            })?),
            None => builder.no_proxy(),
        };
        let client = builder.build().map_err(|e| {
            StorageError::InvalidConfig(format!("Failed to create token client: {}", e))
        })?;

        let authority_host = std::env::var("AZURE_AUTHORITY_HOST")
            .ok()
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());

        Ok(Self {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            authority_host,
            certificate,
            client,
            cache: Mutex::new(None),
        })
    }

    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into();
        self
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Signed JWT proving possession of the certificate's key.
    fn client_assertion(&self) -> StorageResult<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let claims = AssertionClaims {
            aud: self.token_url(),
            iss: self.client_id.clone(),
            sub: self.client_id.clone(),
            jti: uuid::Uuid::new_v4().to_string(),
            nbf: now,
            exp: now + ASSERTION_LIFETIME.as_secs(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.x5t = Some(self.certificate.thumbprint.clone());
        jsonwebtoken::encode(&header, &claims, &self.certificate.key).map_err(|e| {
            StorageError::InvalidCredentials(format!("Failed to sign client assertion: {}", e))
        })
    }

    async fn fetch_token(&self) -> StorageResult<CachedToken> {
        let token_url = self.token_url();
        let assertion = self.client_assertion()?;
        let requested_at = Instant::now();

        let response = self
            .client
            .post(&token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", STORAGE_SCOPE),
                ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                ("client_assertion", assertion.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| StorageError::io(format!("Token request to '{}' failed: {}", token_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::InvalidCredentials(format!(
                "Token request for client_id={} failed with status {}: {}",
                self.client_id, status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            StorageError::io(format!("Invalid token response from '{}': {}", token_url, e))
        })?;
        info!(
            "Acquired certificate token for client_id={} expires_in={}s",
            self.client_id, token.expires_in
        );
        Ok(CachedToken {
            credential: Arc::new(AzureCredential::BearerToken(token.access_token)),
            expires_at: requested_at + Duration::from_secs(token.expires_in),
        })
    }
}

#[async_trait]
impl CredentialProvider for ClientCertificateCredential {
    type Credential = AzureCredential;

    async fn get_credential(&self) -> object_store::Result<Arc<AzureCredential>> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(Arc::clone(&token.credential));
            }
        }

        let token = self.fetch_token().await.map_err(generic_error)?;
        let credential = Arc::clone(&token.credential);
        *cache = Some(token);
        Ok(credential)
    }
}
