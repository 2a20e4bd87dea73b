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

//! Azure storage access layer
//!
//! Everything between a parsed URL and an authenticated blob client: session
//! settings, registered secrets, credential resolution, the per-session context
//! cache, and the `object_store` transport behind the [`client`] boundary.

pub mod client;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod factory;
pub mod object_store;
pub mod opener;
pub mod secret;
pub mod stats;
pub mod token;

// Public exports
pub use client::{BlobClient, BlobServiceClient, RemoteError};
pub use config::{ReadOptions, Settings};
pub use context::{ConnectionContext, ContextCache, ContextState};
pub use credentials::{ConnectionSpec, Credential};
pub use error::{StorageError, StorageResult};
pub use factory::{Connector, ContextFactory};
pub use object_store::{ObjectStoreConnector, SharedStoreConnector};
pub use opener::{FileOpener, Session};
pub use secret::{KeyValueSecret, SecretManager};
pub use stats::{HttpStats, HttpStatsSnapshot};
pub use token::{ChainedCredential, ClientCertificateCredential};
