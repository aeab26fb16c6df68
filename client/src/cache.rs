use std::collections::HashMap;
use std::sync::Mutex;

use jiff::{Span, Timestamp};
use serde_json::Value;

use crate::time::TimeSource;

/// How long a captured GET response stays fresh.
pub const DEFAULT_CACHE_TTL_MINUTES: i64 = 10;

struct CacheEntry {
    payload: Value,
    stored_at: Timestamp,
}

/// In-memory cache of successful GET responses, keyed by request path plus
/// serialized query parameters. Entries expire after a fixed TTL and are
/// evicted lazily on lookup. Process lifetime only; nothing is persisted.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Span,
    time_source: TimeSource,
}

/// Build the cache key for a request: path plus query pairs in the order
/// they are sent.
pub fn cache_key(path: &str, query: &[(String, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let params = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{params}")
}

impl ResponseCache {
    pub fn new(time_source: TimeSource, ttl: Span) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            time_source,
        }
    }

    /// Capture a response payload. Runs on every successful GET.
    pub fn store(&self, key: &str, payload: Value) {
        let entry = CacheEntry {
            payload,
            stored_at: self.time_source.now(),
        };
        self.entries.lock().unwrap().insert(key.to_string(), entry);
        tracing::debug!(key, "cached response");
    }

    /// Return the payload for `key` if present and fresh. Expired entries
    /// are removed on the way.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        let now = self.time_source.now();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if self.is_fresh(entry, now) => {
                tracing::debug!(key, "cache hit");
                Some(entry.payload.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Remove every entry whose key contains `pattern`.
    pub fn invalidate(&self, pattern: &str) {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|key, _| !key.contains(pattern));
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(pattern, removed, "invalidated cache entries");
        }
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &CacheEntry, now: Timestamp) -> bool {
        entry
            .stored_at
            .checked_add(self.ttl)
            .map(|expires_at| now < expires_at)
            .unwrap_or(false)
    }
}
