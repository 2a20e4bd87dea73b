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

//! `azure://` and `az://` URL parsing.

use crate::storage::credentials::DEFAULT_ENDPOINT;
use crate::storage::error::{StorageError, StorageResult};

/// Accepted scheme prefixes, both spellings are interchangeable.
pub const SCHEMES: [&str; 2] = ["azure://", "az://"];

/// A parsed blob URL.
///
/// Two shapes are accepted:
/// * `az://<container>/<path>`
/// * `az://<account>.<endpoint>/<container>/<path>`
///
/// A `.` before the first `/` selects the second shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub container: String,
    pub account: Option<String>,
    pub endpoint: Option<String>,
    /// Scheme prefix exactly as given, e.g. `az://`
    pub prefix: String,
    /// Blob path within the container, without a leading `/`
    pub path: String,
}

impl ParsedUrl {
    /// Parse a blob URL.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the scheme is not recognized, the authority is
    /// not followed by `/`, or the container is empty.
    pub fn parse(url: &str) -> StorageResult<Self> {
        let prefix = SCHEMES
            .iter()
            .find(|scheme| url.starts_with(*scheme))
            .ok_or_else(|| {
                StorageError::InvalidFormat(format!(
                    "URL needs to start with azure:// or az://, got '{}'",
                    url
                ))
            })?;
        let rest = &url[prefix.len()..];

        let slash = rest.find('/').ok_or_else(|| {
            StorageError::InvalidFormat(format!("URL needs to contain a '/' after the host: {}", url))
        })?;

        let (account, endpoint, container, path) = match rest[..slash].find('.') {
            Some(dot) => {
                let after_authority = &rest[slash + 1..];
                let container_end = after_authority.find('/').ok_or_else(|| {
                    StorageError::InvalidFormat(format!(
                        "URL needs to contain a '/' after the container: {}",
                        url
                    ))
                })?;
                (
                    Some(rest[..dot].to_string()),
                    Some(rest[dot + 1..slash].to_string()),
                    &after_authority[..container_end],
                    &after_authority[container_end + 1..],
                )
            }
            None => (None, None, &rest[..slash], &rest[slash + 1..]),
        };

        if container.is_empty() {
            return Err(StorageError::InvalidFormat(format!(
                "URL has an empty container: {}",
                url
            )));
        }

        Ok(Self {
            container: container.to_string(),
            account,
            endpoint,
            prefix: prefix.to_string(),
            path: path.to_string(),
        })
    }

    pub fn endpoint_or_default(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Everything before the blob path: scheme, optional authority and container.
    pub fn result_prefix(&self) -> String {
        match (&self.account, &self.endpoint) {
            (Some(account), Some(endpoint)) => format!(
                "{}{}.{}/{}/",
                self.prefix, account, endpoint, self.container
            ),
            _ => format!("{}{}/", self.prefix, self.container),
        }
    }

    /// Fully-qualified URL for `key` in the same container.
    pub fn url_for(&self, key: &str) -> String {
        format!("{}{}", self.result_prefix(), key)
    }

    /// Reconstruct the URL this was parsed from.
    pub fn to_url(&self) -> String {
        self.url_for(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_form() {
        let parsed = ParsedUrl::parse("az://container/dir/file.csv").unwrap();
        assert_eq!(parsed.container, "container");
        assert_eq!(parsed.account, None);
        assert_eq!(parsed.endpoint, None);
        assert_eq!(parsed.prefix, "az://");
        assert_eq!(parsed.path, "dir/file.csv");
        assert_eq!(parsed.endpoint_or_default(), "blob.core.windows.net");
    }

    #[test]
    fn test_parse_account_form() {
        let parsed =
            ParsedUrl::parse("azure://acct.blob.core.windows.net/container/dir/file.csv").unwrap();
        assert_eq!(parsed.account.as_deref(), Some("acct"));
        assert_eq!(parsed.endpoint.as_deref(), Some("blob.core.windows.net"));
        assert_eq!(parsed.container, "container");
        assert_eq!(parsed.prefix, "azure://");
        assert_eq!(parsed.path, "dir/file.csv");
    }

    #[test]
    fn test_dot_after_first_slash_is_path() {
        let parsed = ParsedUrl::parse("az://container/file.v2.csv").unwrap();
        assert_eq!(parsed.container, "container");
        assert_eq!(parsed.account, None);
        assert_eq!(parsed.path, "file.v2.csv");
    }

    #[test]
    fn test_roundtrip() {
        for url in [
            "az://container/dir/file.csv",
            "azure://container/",
            "az://acct.dfs.core.windows.net/container/a/b/c.parquet",
            "azure://acct.ep/container/",
        ] {
            assert_eq!(ParsedUrl::parse(url).unwrap().to_url(), url);
        }
    }

    #[test]
    fn test_url_for_key() {
        let parsed = ParsedUrl::parse("az://acct.ep/container/data/**/*.csv").unwrap();
        assert_eq!(
            parsed.url_for("data/a/x.csv"),
            "az://acct.ep/container/data/a/x.csv"
        );
    }

    #[test]
    fn test_invalid_urls() {
        for url in [
            "s3://bucket/key",
            "az://container",
            "az:///path",
            "az://acct.ep/container",
            "az://acct.ep//path",
            "azure:/container/x",
        ] {
            match ParsedUrl::parse(url) {
                Err(StorageError::InvalidFormat(_)) => {}
                other => panic!("Expected InvalidFormat for {}, got {:?}", url, other),
            }
        }
    }
}
