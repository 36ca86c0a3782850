//! Cache instrumentation — message sink contract and the logging decorator.
//!
//! [`LoggedCache`] wraps any [`CacheStore`] and emits one log event per
//! operation describing its outcome. It is purely behavioral: arguments and
//! results pass through untouched, and with no sink attached the wrapped
//! store behaves exactly as if it were unwrapped. Alternate instrumentation
//! (metrics, tracing spans) can wrap the same trait independently and
//! compose by nesting decorators.

use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::store::CacheStore;

/// Severity of an emitted cache event.
///
/// `Notice` marks an operation the store reported as failed; it is still
/// observability, not an error path — nothing in this crate escalates a
/// store failure beyond the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Notice,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Notice => "notice",
        })
    }
}

/// A leveled message sink for cache events.
///
/// Events carry a message and a small context mapping (the key or batch
/// size involved). Events are produced, never consumed, by this crate;
/// absence of a sink is legal and means no events.
pub trait MessageSink: Send + Sync {
    /// Records one event.
    fn log(&self, level: Level, message: &str, context: &[(&str, String)]);
}

/// [`MessageSink`] that forwards events to the [`tracing`] ecosystem.
///
/// `Info` events map to `tracing::info!` and `Notice` events to
/// `tracing::warn!`; the context pairs are attached as a debug field.
/// Consumers wire up their own subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn log(&self, level: Level, message: &str, context: &[(&str, String)]) {
        match level {
            Level::Info => tracing::info!(context = ?context, "{message}"),
            Level::Notice => tracing::warn!(context = ?context, "{message}"),
        }
    }
}

/// Decorator that logs every operation of the wrapped [`CacheStore`].
///
/// The sink is attachable and detachable at runtime; without one, operations
/// are forwarded silently. Exactly one event is emitted per call when a sink
/// is attached, with the level determined by the operation's outcome:
/// successful operations log at [`Level::Info`], operations the store
/// reports as failed log at [`Level::Notice`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use reqcache::logger::{LoggedCache, TracingSink};
/// use reqcache::store::{CacheStore, MemoryStore};
///
/// let cache = LoggedCache::new(MemoryStore::<String>::new());
/// cache.attach_sink(Arc::new(TracingSink));
///
/// cache.set("k", "v".to_owned(), Duration::from_secs(30));
/// assert_eq!(cache.get("k"), Some("v".to_owned()));
/// ```
pub struct LoggedCache<S> {
    inner: S,
    sink: RwLock<Option<Arc<dyn MessageSink>>>,
}

impl<S> LoggedCache<S> {
    /// Wraps a store. No sink is attached; until one is, the decorator is
    /// a transparent pass-through.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            sink: RwLock::new(None),
        }
    }

    /// Attaches a sink, replacing any previous one.
    pub fn attach_sink(&self, sink: Arc<dyn MessageSink>) {
        if let Ok(mut slot) = self.sink.write() {
            *slot = Some(sink);
        }
    }

    /// Detaches the current sink, if any.
    pub fn detach_sink(&self) {
        if let Ok(mut slot) = self.sink.write() {
            *slot = None;
        }
    }

    /// Returns a reference to the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn emit(&self, level: Level, message: &str, context: &[(&str, String)]) {
        let sink = match self.sink.read() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        if let Some(sink) = sink {
            sink.log(level, message, context);
        }
    }
}

impl<S: CacheStore> CacheStore for LoggedCache<S> {
    type Value = S::Value;

    fn get(&self, key: &str) -> Option<S::Value> {
        let result = self.inner.get(key);

        match result {
            Some(_) => self.emit(
                Level::Info,
                &format!("Cache key \"{key}\" has successfully retrieved data"),
                &[("key", key.to_owned())],
            ),
            None => self.emit(
                Level::Notice,
                &format!("Cache key \"{key}\" has failed to retrieve data"),
                &[("key", key.to_owned())],
            ),
        }

        result
    }

    fn set(&self, key: &str, value: S::Value, ttl: Duration) -> bool {
        let result = self.inner.set(key, value, ttl);

        if result {
            self.emit(
                Level::Info,
                &format!("Cache key \"{key}\" has been successfully updated"),
                &[("key", key.to_owned())],
            );
        } else {
            self.emit(
                Level::Notice,
                &format!("Cache key \"{key}\" has failed to update"),
                &[("key", key.to_owned())],
            );
        }

        result
    }

    fn delete(&self, key: &str) -> bool {
        let result = self.inner.delete(key);

        if result {
            self.emit(
                Level::Info,
                &format!("Cache key \"{key}\" has been successfully deleted"),
                &[("key", key.to_owned())],
            );
        } else {
            self.emit(
                Level::Notice,
                &format!("Cache key \"{key}\" has failed to delete"),
                &[("key", key.to_owned())],
            );
        }

        result
    }

    fn clear(&self) -> bool {
        let result = self.inner.clear();

        if result {
            self.emit(Level::Info, "Cache has been successfully cleared", &[]);
        } else {
            self.emit(Level::Notice, "Cache has failed to clear", &[]);
        }

        result
    }

    fn get_multiple(&self, keys: &[&str]) -> Vec<Option<S::Value>> {
        let result = self.inner.get_multiple(keys);
        let found = result.iter().filter(|v| v.is_some()).count();

        self.emit(
            Level::Info,
            &format!(
                "{} requested cache keys have returned {found} responses",
                keys.len()
            ),
            &[
                ("requested", keys.len().to_string()),
                ("returned", found.to_string()),
            ],
        );

        result
    }

    fn set_multiple(&self, entries: Vec<(String, S::Value)>, ttl: Duration) -> bool {
        let count = entries.len();
        let result = self.inner.set_multiple(entries, ttl);

        if result {
            self.emit(
                Level::Info,
                &format!("{count} requested cache keys have been successfully updated"),
                &[("count", count.to_string())],
            );
        } else {
            self.emit(
                Level::Notice,
                &format!("{count} requested cache keys have failed to update"),
                &[("count", count.to_string())],
            );
        }

        result
    }

    fn delete_multiple(&self, keys: &[&str]) -> bool {
        let result = self.inner.delete_multiple(keys);

        if result {
            self.emit(
                Level::Info,
                &format!(
                    "{} requested cache keys have been successfully deleted",
                    keys.len()
                ),
                &[("count", keys.len().to_string())],
            );
        } else {
            self.emit(
                Level::Notice,
                &format!("{} requested cache keys have failed to delete", keys.len()),
                &[("count", keys.len().to_string())],
            );
        }

        result
    }

    fn has(&self, key: &str) -> bool {
        let result = self.inner.has(key);

        // Both outcomes are ordinary answers, so both log at info.
        if result {
            self.emit(
                Level::Info,
                &format!("Cache key \"{key}\" exists"),
                &[("key", key.to_owned())],
            );
        } else {
            self.emit(
                Level::Info,
                &format!("Cache key \"{key}\" does not exist"),
                &[("key", key.to_owned())],
            );
        }

        result
    }
}
