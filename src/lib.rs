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

//! # Azure Blob VFS
//!
//! A virtual filesystem adapter that exposes Azure Blob Storage objects as
//! seekable file handles, so a query engine can read `azure://` and `az://`
//! URLs without knowing about the storage protocol, authentication or pagination.
//!
//! ## Features
//!
//! - **Buffered ranged reads**: a per-handle read-ahead window, with large or
//!   direct-I/O reads fetched straight into the caller's buffer
//! - **Glob expansion**: `*`, `?`, `[...]` per path segment and recursive `**`,
//!   resolved with one prefix listing of the container
//! - **Credential resolution**: registered secrets (`config`, `credential_chain`,
//!   `service_principal`) or session settings (connection string, credential chain,
//!   anonymous access)
//! - **Context caching**: one authenticated client per account for the life of a
//!   session, retired when the session ends
//!
//! ## URL formats
//!
//! - `az://<container>/<path>`
//! - `az://<account>.<endpoint>/<container>/<path>`
//!
//! `azure://` is accepted wherever `az://` is.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use azure_blob_vfs::{AzureStorageFileSystem, OpenFlags, Session, Settings};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let session = Session::new(
//!     Settings::new().with_option("azure_credential_chain", "cli;managed_identity"),
//! );
//! let fs = AzureStorageFileSystem::new();
//!
//! for path in fs.glob("az://myaccount.blob.core.windows.net/data/**/*.csv", &session).await? {
//!     let mut handle = fs.open_file(&path, OpenFlags::READ, &session).await?;
//!     let mut head = vec![0u8; 1024];
//!     let count = handle.read(&mut head).await?;
//!     println!("{} ({} bytes): {:?}", path, handle.file_size(), &head[..count]);
//! }
//!
//! // Credentials may change between units of work
//! session.end();
//! # Ok(())
//! # }
//! ```
//!
//! ### Registering a secret
//!
//! ```rust
//! use azure_blob_vfs::{KeyValueSecret, Session, Settings};
//!
//! let session = Session::new(Settings::new());
//! session.secrets().register(
//!     KeyValueSecret::azure("analytics", "service_principal")
//!         .with_scope("az://analytics.blob.core.windows.net/")
//!         .with_value("tenant_id", "00000000-0000-0000-0000-000000000000")
//!         .with_value("client_id", "11111111-1111-1111-1111-111111111111")
//!         .with_value("client_secret", "secret"),
//! );
//! ```

pub mod filesystem;
pub mod storage;
pub mod util;

// Re-export commonly used types
pub use filesystem::{AzureFileHandle, AzureStorageFileSystem, OpenFlags, ParsedUrl};
pub use storage::{
    FileOpener, KeyValueSecret, SecretManager, Session, Settings, StorageError, StorageResult,
};
