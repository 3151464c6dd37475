//! Worker Configuration
//!
//! Explicit configuration passed to the manager at construction. The values
//! that would otherwise be worker-scope globals (cache version tag, asset
//! manifest) live here, so tests can construct managers with injected
//! collaborators.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Cache-name version tag; the single current cache namespace.
    pub cache_name: String,
    /// URLs unconditionally fetched and stored at install time.
    pub precache_manifest: Vec<String>,
    /// Store valid runtime responses fetched on cache misses.
    pub dynamic_caching: bool,
    /// Request immediate activation instead of waiting for existing clients
    /// to release the previous version.
    pub skip_waiting: bool,
    /// Cached page served when the network fails on a cache miss.
    pub offline_fallback: Option<String>,
    /// Sync registrations this worker delivers.
    pub sync_tag: String,
    /// Endpoint receiving queued records as JSON POSTs.
    pub sync_endpoint: String,
    /// Notification icon image.
    pub notification_icon: Option<String>,
    /// Notification badge image.
    pub notification_badge: Option<String>,
}

impl WorkerConfig {
    /// Create a configuration with the given version tag and asset manifest.
    ///
    /// Runtime caching and skip-waiting are off by default; the sync tag
    /// defaults to `sync-data`.
    pub fn new(cache_name: impl Into<String>, precache_manifest: Vec<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            precache_manifest,
            dynamic_caching: false,
            skip_waiting: false,
            offline_fallback: None,
            sync_tag: "sync-data".to_string(),
            sync_endpoint: String::new(),
            notification_icon: None,
            notification_badge: None,
        }
    }

    /// Enable or disable runtime caching of valid network responses.
    pub fn with_dynamic_caching(mut self, enabled: bool) -> Self {
        self.dynamic_caching = enabled;
        self
    }

    /// Request immediate activation once install completes.
    pub fn with_skip_waiting(mut self, enabled: bool) -> Self {
        self.skip_waiting = enabled;
        self
    }

    /// Serve this cached page when the network fails on a cache miss.
    pub fn with_offline_fallback(mut self, url: impl Into<String>) -> Self {
        self.offline_fallback = Some(url.into());
        self
    }

    /// Set the sync tag and delivery endpoint.
    pub fn with_sync(mut self, tag: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.sync_tag = tag.into();
        self.sync_endpoint = endpoint.into();
        self
    }

    /// Set the notification imagery.
    pub fn with_notification_images(
        mut self,
        icon: impl Into<String>,
        badge: impl Into<String>,
    ) -> Self {
        self.notification_icon = Some(icon.into());
        self.notification_badge = Some(badge.into());
        self
    }
}
