//! Cache Store
//!
//! Versioned request/response storage for the worker: one named cache per
//! worker version, entries keyed by request identity.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use spin::RwLock;

use crate::fetch::{Request, Response};

/// Cache error types.
#[derive(Debug, Clone)]
pub enum CacheError {
    /// Cache not found.
    NotFound,
    /// Storage error.
    StorageError(String),
}

/// Cache store collaborator.
///
/// A namespaced request→response mapping: open-or-create by name, match,
/// put, delete by name, enumerate names. Implementations provide atomic
/// per-key put/delete; no cross-key transactions are assumed.
pub trait CacheStore: Send + Sync {
    /// Open the named cache, creating it if absent.
    fn open(&self, name: &str) -> Result<(), CacheError>;

    /// Look up a stored response for the request in the named cache.
    fn match_request(&self, name: &str, request: &Request) -> Option<Response>;

    /// Store a request/response pair in the named cache.
    fn put(&self, name: &str, request: &Request, response: Response) -> Result<(), CacheError>;

    /// Delete the named cache. Returns whether it existed.
    fn delete(&self, name: &str) -> Result<bool, CacheError>;

    /// Enumerate all cache names.
    fn names(&self) -> Vec<String>;

    /// Check if a cache exists.
    fn has(&self, name: &str) -> bool {
        self.names().iter().any(|n| n == name)
    }
}

/// Request identity: method + URL.
fn cache_key(request: &Request) -> String {
    let mut key = String::from(request.method.as_str());
    key.push(':');
    key.push_str(&request.url);
    key
}

/// A cached request/response pair.
#[derive(Debug, Clone)]
struct CacheEntry {
    response: Response,
    size: usize,
}

impl CacheEntry {
    fn new(response: Response) -> Self {
        let size = response.body.as_ref().map(|b| b.len()).unwrap_or(0);
        Self { response, size }
    }
}

/// A single named cache.
#[derive(Debug, Default)]
struct Cache {
    entries: BTreeMap<String, CacheEntry>,
    total_size: usize,
}

impl Cache {
    fn match_request(&self, request: &Request) -> Option<Response> {
        self.entries
            .get(&cache_key(request))
            .map(|e| e.response.clone_response())
    }

    fn put(&mut self, request: &Request, response: Response) {
        let key = cache_key(request);
        let entry = CacheEntry::new(response);

        if let Some(old) = self.entries.remove(&key) {
            self.total_size -= old.size;
        }
        self.total_size += entry.size;
        self.entries.insert(key, entry);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn size(&self) -> usize {
        self.total_size
    }
}

/// In-memory cache store.
///
/// Named caches behind a single lock: fetch-time lookups take the read
/// guard, population and eviction take the write guard.
pub struct MemoryCacheStorage {
    caches: RwLock<BTreeMap<String, Cache>>,
}

impl MemoryCacheStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            caches: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of entries in the named cache, if it exists.
    pub fn entry_count(&self, name: &str) -> Option<usize> {
        self.caches.read().get(name).map(|c| c.len())
    }

    /// Total stored body bytes in the named cache, if it exists.
    pub fn usage(&self, name: &str) -> Option<usize> {
        self.caches.read().get(name).map(|c| c.size())
    }
}

impl Default for MemoryCacheStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCacheStorage {
    fn open(&self, name: &str) -> Result<(), CacheError> {
        self.caches.write().entry(name.to_string()).or_default();
        Ok(())
    }

    fn match_request(&self, name: &str, request: &Request) -> Option<Response> {
        self.caches
            .read()
            .get(name)
            .and_then(|cache| cache.match_request(request))
    }

    fn put(&self, name: &str, request: &Request, response: Response) -> Result<(), CacheError> {
        let mut caches = self.caches.write();
        let cache = caches.entry(name.to_string()).or_default();
        cache.put(request, response);
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool, CacheError> {
        Ok(self.caches.write().remove(name).is_some())
    }

    fn names(&self) -> Vec<String> {
        self.caches.read().keys().cloned().collect()
    }
}
