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

//! Registered secrets and scope-based lookup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Secret type tag used for Azure storage secrets.
pub const AZURE_SECRET_TYPE: &str = "azure";

/// A typed, provider-tagged bag of key/value pairs.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyValueSecret {
    pub name: String,

    #[serde(rename = "type")]
    pub secret_type: String,

    /// Provider kind, `config` when not given
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Path prefixes the secret applies to. Empty means every path.
    #[serde(default)]
    pub scope: Vec<String>,

    #[serde(default)]
    pub values: HashMap<String, String>,
}

fn default_provider() -> String {
    "config".to_string()
}

impl KeyValueSecret {
    /// Create an Azure secret for the given provider kind.
    pub fn azure(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret_type: AZURE_SECRET_TYPE.to_string(),
            provider: provider.into(),
            scope: Vec::new(),
            values: HashMap::new(),
        }
    }

    /// Add a key/value pair (for method chaining).
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Restrict the secret to paths starting with `prefix`.
    pub fn with_scope(mut self, prefix: impl Into<String>) -> Self {
        self.scope.push(prefix.into());
        self
    }

    /// Look a value up. Empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Length of the longest scope entry matching `path`, if any.
    fn match_length(&self, path: &str) -> Option<usize> {
        if self.scope.is_empty() {
            return Some(0);
        }
        self.scope
            .iter()
            .filter(|prefix| path.starts_with(prefix.as_str()))
            .map(String::len)
            .max()
    }
}

// Values hold credentials, keep them out of logs.
impl std::fmt::Debug for KeyValueSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("KeyValueSecret")
            .field("name", &self.name)
            .field("secret_type", &self.secret_type)
            .field("provider", &self.provider)
            .field("scope", &self.scope)
            .field("keys", &keys)
            .finish()
    }
}

/// Secrets registered with the host engine.
#[derive(Debug, Default)]
pub struct SecretManager {
    secrets: RwLock<Vec<KeyValueSecret>>,
}

impl SecretManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret, replacing any existing secret with the same name.
    pub fn register(&self, secret: KeyValueSecret) {
        let mut secrets = self.secrets.write().unwrap_or_else(|e| e.into_inner());
        secrets.retain(|existing| existing.name != secret.name);
        secrets.push(secret);
    }

    /// Drop a secret by name. Returns whether it existed.
    pub fn drop_secret(&self, name: &str) -> bool {
        let mut secrets = self.secrets.write().unwrap_or_else(|e| e.into_inner());
        let before = secrets.len();
        secrets.retain(|existing| existing.name != name);
        secrets.len() != before
    }

    /// Find the secret of `secret_type` whose scope best matches `path`.
    ///
    /// The longest matching scope prefix wins; ties go to the secret registered first.
    pub fn lookup(&self, path: &str, secret_type: &str) -> Option<KeyValueSecret> {
        let secrets = self.secrets.read().unwrap_or_else(|e| e.into_inner());
        let mut best: Option<(usize, &KeyValueSecret)> = None;
        for secret in secrets.iter().filter(|s| s.secret_type == secret_type) {
            if let Some(length) = secret.match_length(path) {
                if best.map_or(true, |(best_length, _)| length > best_length) {
                    best = Some((length, secret));
                }
            }
        }

        if let Some((_, secret)) = best {
            debug!("Secret name={} matched path={}", secret.name, path);
        }
        best.map(|(_, secret)| secret.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_longest_scope() {
        let manager = SecretManager::new();
        manager.register(KeyValueSecret::azure("global", "config"));
        manager.register(
            KeyValueSecret::azure("scoped", "credential_chain").with_scope("az://container/data"),
        );

        let found = manager.lookup("az://container/data/x.csv", AZURE_SECRET_TYPE);
        assert_eq!(found.map(|s| s.name), Some("scoped".to_string()));

        let found = manager.lookup("az://other/x.csv", AZURE_SECRET_TYPE);
        assert_eq!(found.map(|s| s.name), Some("global".to_string()));
    }

    #[test]
    fn test_lookup_filters_type() {
        let manager = SecretManager::new();
        let mut secret = KeyValueSecret::azure("s3_secret", "config");
        secret.secret_type = "s3".to_string();
        manager.register(secret);

        assert!(manager.lookup("az://c/x", AZURE_SECRET_TYPE).is_none());
    }

    #[test]
    fn test_scope_mismatch() {
        let manager = SecretManager::new();
        manager.register(KeyValueSecret::azure("scoped", "config").with_scope("azure://only"));

        assert!(manager.lookup("az://only/x", AZURE_SECRET_TYPE).is_none());
        assert!(manager.lookup("azure://only/x", AZURE_SECRET_TYPE).is_some());
    }

    #[test]
    fn test_register_replaces_and_drop() {
        let manager = SecretManager::new();
        manager.register(KeyValueSecret::azure("s", "config").with_value("account_name", "a"));
        manager.register(KeyValueSecret::azure("s", "config").with_value("account_name", "b"));

        let found = manager.lookup("az://c/x", AZURE_SECRET_TYPE).unwrap();
        assert_eq!(found.get("account_name"), Some("b"));

        assert!(manager.drop_secret("s"));
        assert!(!manager.drop_secret("s"));
        assert!(manager.lookup("az://c/x", AZURE_SECRET_TYPE).is_none());
    }

    #[test]
    fn test_empty_value_is_absent() {
        let secret = KeyValueSecret::azure("s", "config").with_value("connection_string", "");
        assert!(secret.get("connection_string").is_none());
    }

    #[test]
    fn test_secret_deserialization_defaults_provider() {
        let json = r#"{"name":"s","type":"azure","values":{"account_name":"acct"}}"#;
        let secret: KeyValueSecret = serde_json::from_str(json).unwrap();

        assert_eq!(secret.provider, "config");
        assert!(secret.scope.is_empty());
        assert_eq!(secret.get("account_name"), Some("acct"));
    }

    #[test]
    fn test_debug_hides_values() {
        let secret = KeyValueSecret::azure("s", "service_principal")
            .with_value("client_secret", "super-secret-value");
        let debug_str = format!("{:?}", secret);
        assert!(debug_str.contains("client_secret"));
        assert!(!debug_str.contains("super-secret-value"));
    }
}
