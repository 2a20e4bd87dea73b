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

use thiserror::Error;

use super::client::RemoteError;

/// Errors that can occur while resolving, opening, reading or listing blobs
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid URL format: {0}")]
    InvalidFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("IO error: {message}")]
    Io {
        message: String,
        code: Option<String>,
        reason: Option<String>,
    },

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl StorageError {
    /// Build an IO error that carries no remote code or reason.
    pub fn io(message: impl Into<String>) -> Self {
        StorageError::Io {
            message: message.into(),
            code: None,
            reason: None,
        }
    }

    /// Build an IO error from a remote failure, keeping its code and reason phrase.
    ///
    /// # Arguments
    ///
    /// * `context` - Human-readable description of the operation that failed
    /// * `error` - The failure reported by the remote client
    pub fn from_remote(context: impl Into<String>, error: RemoteError) -> Self {
        let context = context.into();
        match error {
            RemoteError::Service {
                code,
                reason,
                message,
                ..
            } => StorageError::Io {
                message: format!(
                    "{} failed with code '{}', Reason Phrase: '{}', Message: '{}'",
                    context, code, reason, message
                ),
                code: Some(code),
                reason: Some(reason),
            },
            RemoteError::InvalidPath(message) => {
                StorageError::InvalidFormat(format!("{}: {}", context, message))
            }
            RemoteError::Other(message) => StorageError::Io {
                message: format!("{} failed: {}", context, message),
                code: None,
                reason: None,
            },
        }
    }

    /// Remote error code, when the failure came from the storage service.
    pub fn code(&self) -> Option<&str> {
        match self {
            StorageError::Io { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Remote reason phrase, when the failure came from the storage service.
    pub fn reason(&self) -> Option<&str> {
        match self {
            StorageError::Io { reason, .. } => reason.as_deref(),
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_format_error() {
        let error = StorageError::InvalidFormat("s3://bucket".to_string());
        assert_eq!(error.to_string(), "Invalid URL format: s3://bucket");
    }

    #[test]
    fn test_io_without_remote_details() {
        let error = StorageError::io("short read");
        assert_eq!(error.to_string(), "IO error: short read");
        assert!(error.code().is_none());
        assert!(error.reason().is_none());
    }

    #[test]
    fn test_from_remote_service_error_keeps_code_and_reason() {
        let error = StorageError::from_remote(
            "open file 'az://c/x.csv'",
            RemoteError::Service {
                status: 404,
                code: "BlobNotFound".to_string(),
                reason: "The specified blob does not exist.".to_string(),
                message: "not found".to_string(),
            },
        );

        assert_eq!(error.code(), Some("BlobNotFound"));
        assert_eq!(error.reason(), Some("The specified blob does not exist."));
        assert!(error.to_string().contains("open file 'az://c/x.csv'"));
        assert!(error.to_string().contains("BlobNotFound"));
    }

    #[test]
    fn test_from_remote_other_error() {
        let error = StorageError::from_remote("list", RemoteError::Other("boom".to_string()));
        match error {
            StorageError::Io { message, code, .. } => {
                assert_eq!(message, "list failed: boom");
                assert!(code.is_none());
            }
            _ => panic!("Expected Io variant"),
        }
    }

    #[test]
    fn test_from_remote_invalid_path() {
        let error = StorageError::from_remote(
            "open file 'az://c/a//b'",
            RemoteError::InvalidPath("empty segment in 'a//b'".to_string()),
        );
        match error {
            StorageError::InvalidFormat(message) => {
                assert!(message.starts_with("open file 'az://c/a//b'"));
                assert!(message.contains("empty segment"));
            }
            other => panic!("Expected InvalidFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_error_debug() {
        let error = StorageError::MissingField("tenant_id".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("MissingField"));
    }
}
