// Copyright 2022 Adobe. All rights reserved.
// This file is licensed to you under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License. You may obtain a copy
// of the License at http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under
// the License is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR REPRESENTATIONS
// OF ANY KIND, either express or implied. See the License for the specific language
// governing permissions and limitations under the License.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use super::error::{StorageError, StorageResult};

/// Read buffer size per file handle, in bytes.
pub const READ_BUFFER_SIZE: &str = "azure_read_buffer_size";
/// Maximum number of concurrent chunk downloads for one ranged read.
pub const READ_TRANSFER_CONCURRENCY: &str = "azure_read_transfer_concurrency";
/// Chunk size used to split one ranged read, in bytes.
pub const READ_TRANSFER_CHUNK_SIZE: &str = "azure_read_transfer_chunk_size";
/// Cache connection contexts per account for the session.
pub const CONTEXT_CACHING: &str = "azure_context_caching";
/// Record HTTP statistics for requests made through a context.
pub const HTTP_STATS: &str = "azure_http_stats";
/// Transport implementation, `default` or `curl`.
pub const TRANSPORT_OPTION_TYPE: &str = "azure_transport_option_type";
pub const HTTP_PROXY: &str = "azure_http_proxy";
pub const PROXY_USER_NAME: &str = "azure_proxy_user_name";
pub const PROXY_PASSWORD: &str = "azure_proxy_password";
pub const STORAGE_CONNECTION_STRING: &str = "azure_storage_connection_string";
pub const CREDENTIAL_CHAIN: &str = "azure_credential_chain";
pub const ACCOUNT_NAME: &str = "azure_account_name";
pub const ENDPOINT: &str = "azure_endpoint";

/// Every setting understood by the filesystem.
pub const KNOWN_SETTINGS: [&str; 13] = [
    READ_BUFFER_SIZE,
    READ_TRANSFER_CONCURRENCY,
    READ_TRANSFER_CHUNK_SIZE,
    CONTEXT_CACHING,
    HTTP_STATS,
    TRANSPORT_OPTION_TYPE,
    HTTP_PROXY,
    PROXY_USER_NAME,
    PROXY_PASSWORD,
    STORAGE_CONNECTION_STRING,
    CREDENTIAL_CHAIN,
    ACCOUNT_NAME,
    ENDPOINT,
];

const DEFAULT_BUFFER_SIZE: u64 = 1024 * 1024;
const DEFAULT_TRANSFER_CONCURRENCY: usize = 5;
const DEFAULT_TRANSFER_CHUNK_SIZE: u64 = 1024 * 1024;

/// Session-scoped settings.
///
/// Settings are a flat map of option names to string values, the same shape the
/// host engine stores them in. Every option is optional; typed accessors apply
/// the documented defaults.
///
/// # Examples
///
/// ```
/// use azure_blob_vfs::storage::Settings;
///
/// let settings = Settings::new()
///     .with_option("azure_account_name", "myaccount")
///     .with_option("azure_read_buffer_size", "65536");
///
/// assert_eq!(settings.get_option("azure_account_name"), Some(&"myaccount".to_string()));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub options: HashMap<String, String>,
}

impl Settings {
    /// Create an empty settings map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a setting.
    ///
    /// # Arguments
    ///
    /// * `key` - The setting name
    /// * `value` - The setting value
    ///
    /// # Returns
    ///
    /// The `Settings` instance with the added option (for method chaining).
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Add multiple settings.
    pub fn with_options(mut self, options: HashMap<String, String>) -> Self {
        self.options.extend(options);
        self
    }

    /// Set a setting in place.
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    /// Remove a setting, returning its previous value.
    pub fn reset_option(&mut self, key: &str) -> Option<String> {
        self.options.remove(key)
    }

    /// Get a setting.
    ///
    /// # Returns
    ///
    /// `Some(&String)` if the option exists, `None` otherwise.
    pub fn get_option(&self, key: &str) -> Option<&String> {
        self.options.get(key)
    }

    /// Load every known setting from the `AZURE_*` environment variables.
    ///
    /// `azure_account_name` is read from `AZURE_ACCOUNT_NAME`, and so on.
    pub fn from_env() -> Self {
        let mut settings = Self::new();
        for key in KNOWN_SETTINGS {
            if let Ok(value) = std::env::var(key.to_uppercase()) {
                settings.set_option(key, value);
            }
        }
        settings
    }
}

/// Parse an optional setting value into `T`.
///
/// Empty values count as unset.
pub fn parse_setting<T: FromStr>(key: &str, value: Option<&str>) -> StorageResult<Option<T>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            StorageError::InvalidConfig(format!("Invalid value '{}' for setting '{}'", raw, key))
        }),
    }
}

/// Parse an optional boolean setting.
pub fn parse_bool_setting(key: &str, value: Option<&str>) -> StorageResult<Option<bool>> {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") => Ok(None),
        Some("true" | "1" | "on" | "yes") => Ok(Some(true)),
        Some("false" | "0" | "off" | "no") => Ok(Some(false)),
        Some(raw) => Err(StorageError::InvalidConfig(format!(
            "Invalid boolean '{}' for setting '{}'",
            raw, key
        ))),
    }
}

/// Read tuning, fixed for the lifetime of a connection context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadOptions {
    pub transfer_concurrency: usize,
    pub transfer_chunk_size: u64,
    pub buffer_size: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            transfer_concurrency: DEFAULT_TRANSFER_CONCURRENCY,
            transfer_chunk_size: DEFAULT_TRANSFER_CHUNK_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ReadOptions {
    /// Resolve read options from settings.
    ///
    /// # Arguments
    ///
    /// * `get` - Setting lookup, usually backed by the session
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a value does not parse or is zero.
    pub fn from_settings<F>(get: F) -> StorageResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();

        if let Some(concurrency) = parse_setting::<usize>(
            READ_TRANSFER_CONCURRENCY,
            get(READ_TRANSFER_CONCURRENCY).as_deref(),
        )? {
            options.transfer_concurrency = concurrency;
        }
        if let Some(chunk_size) = parse_setting::<u64>(
            READ_TRANSFER_CHUNK_SIZE,
            get(READ_TRANSFER_CHUNK_SIZE).as_deref(),
        )? {
            options.transfer_chunk_size = chunk_size;
        }
        if let Some(buffer_size) =
            parse_setting::<u64>(READ_BUFFER_SIZE, get(READ_BUFFER_SIZE).as_deref())?
        {
            options.buffer_size = buffer_size;
        }

        for (key, value) in [
            (READ_TRANSFER_CONCURRENCY, options.transfer_concurrency as u64),
            (READ_TRANSFER_CHUNK_SIZE, options.transfer_chunk_size),
            (READ_BUFFER_SIZE, options.buffer_size),
        ] {
            if value == 0 {
                return Err(StorageError::InvalidConfig(format!(
                    "Setting '{}' must be greater than zero",
                    key
                )));
            }
        }

        Ok(options)
    }
}
