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

//! The host-engine collaborator a filesystem call runs under.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use tracing::info;

use super::config::Settings;
use super::context::ContextCache;
use super::secret::{KeyValueSecret, SecretManager};
use super::stats::HttpStats;

/// Session services available to filesystem operations.
///
/// Implemented by the host engine. Every method is optional in spirit: an opener
/// without a context cache simply disables caching, one without stats disables
/// HTTP statistics.
pub trait FileOpener: Send + Sync {
    /// Current value of a session setting.
    fn setting(&self, key: &str) -> Option<String>;

    /// Best-matching secret of `secret_type` for `path`.
    fn lookup_secret(&self, path: &str, secret_type: &str) -> Option<KeyValueSecret>;

    /// Session-scoped context cache.
    fn context_cache(&self) -> Option<&ContextCache> {
        None
    }

    /// Sink for HTTP statistics.
    fn http_stats(&self) -> Option<Arc<HttpStats>> {
        None
    }
}

impl Debug for dyn FileOpener {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "FileOpener")
    }
}

/// A logical unit of work: settings, secrets, cached contexts and statistics.
#[derive(Debug)]
pub struct Session {
    settings: Settings,
    secrets: Arc<SecretManager>,
    contexts: ContextCache,
    stats: Arc<HttpStats>,
}

impl Session {
    /// Session with its own empty secret manager.
    pub fn new(settings: Settings) -> Self {
        Self::with_secrets(settings, Arc::new(SecretManager::new()))
    }

    /// Session sharing a secret manager with other sessions.
    pub fn with_secrets(settings: Settings, secrets: Arc<SecretManager>) -> Self {
        Self {
            settings,
            secrets,
            contexts: ContextCache::new(),
            stats: Arc::new(HttpStats::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn secrets(&self) -> &SecretManager {
        &self.secrets
    }

    pub fn stats(&self) -> &Arc<HttpStats> {
        &self.stats
    }

    /// Session boundary: retires every cached context.
    ///
    /// The next access builds a fresh context, picking up changed secrets or settings.
    pub fn end(&self) {
        info!("Session ended, retiring {} cached context(s)", self.contexts.len());
        self.contexts.retire_all();
    }
}

impl FileOpener for Session {
    fn setting(&self, key: &str) -> Option<String> {
        self.settings.get_option(key).cloned()
    }

    fn lookup_secret(&self, path: &str, secret_type: &str) -> Option<KeyValueSecret> {
        self.secrets.lookup(path, secret_type)
    }

    fn context_cache(&self) -> Option<&ContextCache> {
        Some(&self.contexts)
    }

    fn http_stats(&self) -> Option<Arc<HttpStats>> {
        Some(Arc::clone(&self.stats))
    }
}
