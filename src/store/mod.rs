//! Generic key-value cache contract and the in-memory reference backend.
//!
//! The cache-aside layer never talks to a concrete backend directly; it is
//! written against [`CacheStore`]. Backends with real persistence (Redis,
//! disk) implement the same trait in their own crates.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A generic key-value cache.
///
/// Presence is signaled explicitly: [`get`](Self::get) returns
/// `Option<Value>`, so an intentionally cached empty value is still a hit.
/// Mutating operations return `bool`; `false` means the store could not
/// complete the operation. Store failures are never escalated to panics or
/// errors by this crate — callers decide what a `false` means to them.
///
/// Entry expiry is the store's responsibility. The TTL handed to
/// [`set`](Self::set) is advisory from the caller's point of view; the
/// interceptor never re-checks it.
///
/// Implementations must be `Send + Sync`; operations take `&self`, so
/// mutable state needs interior mutability.
pub trait CacheStore: Send + Sync {
    /// The cached value type. Cloned out of the store on every hit.
    type Value: Clone + Send + Sync;

    /// Returns the value cached under `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Option<Self::Value>;

    /// Stores `value` under `key` for at most `ttl`. Returns `true` on success.
    fn set(&self, key: &str, value: Self::Value, ttl: Duration) -> bool;

    /// Removes the entry under `key`. Returns `true` if the store accepted
    /// the deletion.
    fn delete(&self, key: &str) -> bool;

    /// Removes every entry. Returns `true` on success.
    fn clear(&self) -> bool;

    /// Looks up several keys at once; the result is index-aligned with `keys`.
    fn get_multiple(&self, keys: &[&str]) -> Vec<Option<Self::Value>>;

    /// Stores several entries under a shared TTL. Returns `true` only if the
    /// whole batch was accepted.
    fn set_multiple(&self, entries: Vec<(String, Self::Value)>, ttl: Duration) -> bool;

    /// Removes several entries. Returns `true` only if the whole batch was
    /// accepted.
    fn delete_multiple(&self, keys: &[&str]) -> bool;

    /// Returns `true` if a live (non-expired) entry exists under `key`.
    fn has(&self, key: &str) -> bool;
}

/// In-memory [`CacheStore`] backed by a mutex-guarded `HashMap`.
///
/// Expiry is lazy: an entry past its deadline is dropped the next time it is
/// touched by `get`, `get_multiple`, or `has`. Suitable for tests and
/// single-process use; it makes no attempt to bound memory.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use reqcache::store::{CacheStore, MemoryStore};
///
/// let store: MemoryStore<String> = MemoryStore::new();
/// assert!(store.set("greeting", "hello".to_owned(), Duration::from_secs(60)));
/// assert_eq!(store.get("greeting"), Some("hello".to_owned()));
/// assert_eq!(store.get("missing"), None);
/// ```
pub struct MemoryStore<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
}

struct Entry<V> {
    value: V,
    deadline: Instant,
}

impl<V> MemoryStore<V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the number of live entries, dropping any that have expired.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| entry.deadline > now);
        entries.len()
    }

    /// Returns `true` if the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send + Sync> CacheStore for MemoryStore<V> {
    type Value = V;

    fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.deadline > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: V, ttl: Duration) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_owned(),
            Entry {
                value,
                deadline: Instant::now() + ttl,
            },
        );
        true
    }

    fn delete(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).is_some()
    }

    fn clear(&self) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        true
    }

    fn get_multiple(&self, keys: &[&str]) -> Vec<Option<V>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    fn set_multiple(&self, batch: Vec<(String, V)>, ttl: Duration) -> bool {
        let deadline = Instant::now() + ttl;
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in batch {
            entries.insert(key, Entry { value, deadline });
        }
        true
    }

    fn delete_multiple(&self, keys: &[&str]) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for key in keys {
            entries.remove(*key);
        }
        true
    }

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
