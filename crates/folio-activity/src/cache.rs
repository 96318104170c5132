//! TTL cache keyed by canonical parameter JSON.
//!
//! Expired entries are never purged. A lookup treats them as a miss and the
//! next successful fetch overwrites them.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{FetchError, FetchResult};

/// Cached data and the time it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub data: T,
    pub fetched_at_ms: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, fetched_at_ms: u64) -> Self {
        Self {
            data,
            fetched_at_ms,
        }
    }

    /// Fresh while `now_ms - fetched_at_ms < ttl_ms`.
    pub fn is_fresh(&self, now_ms: u64, ttl_ms: u64) -> bool {
        now_ms.saturating_sub(self.fetched_at_ms) < ttl_ms
    }

    /// Milliseconds since the entry was fetched.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.fetched_at_ms)
    }
}

/// Cache key for `params`: compact JSON with object keys sorted.
///
/// Two parameter values that serialize to the same JSON share a key, whatever
/// their field or map order.
///
/// # Errors
///
/// Returns [`FetchError::Params`] when `params` cannot be serialized.
pub fn cache_key<P: Serialize + ?Sized>(params: &P) -> FetchResult<String> {
    let value = serde_json::to_value(params).map_err(|err| FetchError::Params(err.to_string()))?;
    serde_json::to_string(&canonicalize(value)).map_err(|err| FetchError::Params(err.to_string()))
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, canonicalize(value)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Map from cache key to the latest entry.
#[derive(Debug, Clone)]
pub struct TtlCache<T> {
    ttl_ms: u64,
    entries: HashMap<String, CacheEntry<T>>,
}

impl<T> TtlCache<T> {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            entries: HashMap::new(),
        }
    }

    /// The entry for `key` if it is still fresh at `now_ms`.
    pub fn get_fresh(&self, key: &str, now_ms: u64) -> Option<&CacheEntry<T>> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(now_ms, self.ttl_ms))
    }

    /// The entry for `key`, fresh or not.
    pub fn get(&self, key: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    /// Store `entry` unless a newer one is already cached.
    ///
    /// Returns true when the entry was written. Equal timestamps overwrite.
    pub fn insert(&mut self, key: String, entry: CacheEntry<T>) -> bool {
        match self.entries.get(&key) {
            Some(existing) if existing.fetched_at_ms > entry.fetched_at_ms => false,
            _ => {
                self.entries.insert(key, entry);
                true
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }
}
