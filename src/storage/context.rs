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

//! Connection contexts and their session-scoped cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use super::client::{BlobClient, BlobServiceClient};
use super::config::ReadOptions;
use super::error::{StorageError, StorageResult};

/// Lifecycle of a [`ConnectionContext`]. `Active` becomes `Retired` once and never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Active,
    Retired,
}

/// An authenticated account client plus the read tuning it was built with.
#[derive(Debug)]
pub struct ConnectionContext {
    service_client: Arc<dyn BlobServiceClient>,
    read_options: ReadOptions,
    retired: AtomicBool,
}

impl ConnectionContext {
    pub fn new(service_client: Arc<dyn BlobServiceClient>, read_options: ReadOptions) -> Self {
        Self {
            service_client,
            read_options,
            retired: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ContextState {
        if self.retired.load(Ordering::Acquire) {
            ContextState::Retired
        } else {
            ContextState::Active
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == ContextState::Active
    }

    /// Mark the context retired. Handles already opened keep working.
    pub fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    pub fn read_options(&self) -> &ReadOptions {
        &self.read_options
    }

    pub fn service_client(&self) -> &Arc<dyn BlobServiceClient> {
        &self.service_client
    }

    /// Client for one blob.
    ///
    /// # Errors
    ///
    /// Returns `Io` when the context has been retired.
    pub fn blob_client(&self, container: &str, path: &str) -> StorageResult<Arc<dyn BlobClient>> {
        if !self.is_active() {
            return Err(StorageError::io(
                "Connection context has been retired, a new one must be created",
            ));
        }
        Ok(self.service_client.blob_client(container, path))
    }
}

/// Contexts keyed by account name for one session.
///
/// The empty account name is a valid key, used when the account comes from settings.
#[derive(Debug, Default)]
pub struct ContextCache {
    entries: Mutex<HashMap<String, Arc<ConnectionContext>>>,
}

impl ContextCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached active context for `account`, if any.
    pub fn get(&self, account: &str) -> Option<Arc<ConnectionContext>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let context = entries.get(account)?;
        if context.is_active() {
            debug!("Context cache hit for account='{}'", account);
            Some(Arc::clone(context))
        } else {
            debug!("Cached context for account='{}' is retired", account);
            None
        }
    }

    /// Insert or replace the context for `account`.
    pub fn insert(&self, account: &str, context: Arc<ConnectionContext>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(account.to_string(), context);
    }

    /// Retire every cached context. Entries stay until replaced.
    pub fn retire_all(&self) {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for context in entries.values() {
            context.retire();
        }
        debug!("Retired {} cached context(s)", entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
