//! Cache-aside middleware — intercepts outbound requests ahead of an
//! upstream executor.
//!
//! This module defines the executor seam and the interceptor that wraps it.
//!
//! ## Core types
//!
//! - [`RequestExecutor`] — trait implemented by upstream transports.
//! - [`Executor`] — type-erased, cheaply-cloneable executor function.
//! - [`from_executor`] — converts a [`RequestExecutor`] trait object into an
//!   [`Executor`].
//! - [`Options`] — per-call configuration forwarded to the upstream.
//! - [`CachedMiddleware`] — the cache-aside interceptor.
//!
//! ## Protocol
//!
//! For every request the wrapped executor derives a cache key, consults the
//! store, and on a hit resolves immediately — the upstream is never invoked.
//! On a miss it awaits the upstream and, only on success, writes the response
//! back under the effective TTL before handing it to the caller. A failed
//! upstream call propagates unchanged and never touches the cache.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::http::{Request, Response};
use crate::key::CacheKey;
use crate::store::CacheStore;

/// Recognized option name: per-call TTL override, in whole seconds.
pub const CACHE_TIME_IN_S: &str = "cache_time";

/// TTL applied when neither the constructor nor the call supplies one.
const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(5);

/// A transport-level failure reported by an upstream executor.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("failed to connect to {host}: {reason}")]
    Connect { host: String, reason: String },

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by an [`Executor`] call.
///
/// Upstream failures pass through as [`Error::Transfer`] without being
/// rewrapped, so the caller observes the original transport error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The `cache_time` option was present but not a positive integer.
    ///
    /// Policy: fail fast. A malformed TTL rejects the call before the
    /// upstream is contacted, rather than being silently coerced.
    #[error("invalid `{CACHE_TIME_IN_S}` option: {reason}")]
    InvalidCacheTime { reason: String },
}

/// The result of executing an outbound request.
pub type ExecuteResult = Result<Response, Error>;

/// A pinned, `Send` future — the return shape of every executor.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A type-erased, reference-counted request executor.
///
/// Every layer of the client call chain is an `Executor`. The [`Arc`]
/// wrapper makes layers cheap to clone so interceptors can capture the
/// upstream without copying closures.
///
/// Construct one with [`from_executor`] or by wrapping a closure directly:
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use reqcache::http::{Response, StatusCode};
/// use reqcache::middleware::{Executor, Options};
///
/// let upstream: Executor = Arc::new(|_request, _options: Options| {
///     Box::pin(async { Ok(Response::new(StatusCode::Ok).body("fresh")) })
/// });
/// ```
pub type Executor =
    Arc<dyn Fn(Request, Options) -> BoxFuture<ExecuteResult> + Send + Sync + 'static>;

/// The trait for upstream request transports.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync`; executors are shared across
///   tasks.
/// - `execute` **must** return a pinned, `Send` future.
/// - A transport failure is reported as [`TransferError`], never by
///   substituting a synthetic response.
pub trait RequestExecutor: Send + Sync {
    /// Executes one outbound request with its per-call options.
    fn execute(&self, request: Request, options: Options) -> BoxFuture<ExecuteResult>;
}

/// Converts a [`RequestExecutor`] implementation into an [`Executor`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use reqcache::http::{Request, Response, StatusCode};
/// use reqcache::middleware::{
///     BoxFuture, ExecuteResult, Options, RequestExecutor, from_executor,
/// };
///
/// struct NoopTransport;
///
/// impl RequestExecutor for NoopTransport {
///     fn execute(&self, _request: Request, _options: Options) -> BoxFuture<ExecuteResult> {
///         Box::pin(async { Ok(Response::new(StatusCode::NoContent)) })
///     }
/// }
///
/// let executor = from_executor(Arc::new(NoopTransport));
/// ```
pub fn from_executor<E>(executor: Arc<E>) -> Executor
where
    E: RequestExecutor + 'static,
{
    Arc::new(move |request: Request, options: Options| executor.execute(request, options))
}

/// Per-call options attached to an outbound request.
///
/// The cache layer recognizes exactly one key, [`CACHE_TIME_IN_S`]; every
/// other entry is carried through to the upstream executor untouched.
///
/// # Examples
///
/// ```
/// use reqcache::middleware::{CACHE_TIME_IN_S, Options};
///
/// let options = Options::new()
///     .with(CACHE_TIME_IN_S, 16)
///     .with("auth_token", "abc-123");
///
/// assert_eq!(options.cache_time().unwrap().unwrap().as_secs(), 16);
/// assert_eq!(options.get("auth_token").and_then(|v| v.as_str()), Some("abc-123"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Options {
    entries: HashMap<String, serde_json::Value>,
}

impl Options {
    /// Creates an empty options map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the same map with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Sets `key` to `value` in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    /// Returns `true` if no options are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all `(key, value)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Resolves the [`CACHE_TIME_IN_S`] option.
    ///
    /// Returns `Ok(None)` when the option is absent, `Ok(Some(ttl))` for a
    /// positive integer number of seconds, and
    /// [`Error::InvalidCacheTime`] for anything else (wrong type, zero,
    /// or negative).
    pub fn cache_time(&self) -> Result<Option<Duration>, Error> {
        let Some(value) = self.entries.get(CACHE_TIME_IN_S) else {
            return Ok(None);
        };

        match value.as_u64() {
            Some(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
            _ => Err(Error::InvalidCacheTime {
                reason: format!("expected a positive integer of seconds, got {value}"),
            }),
        }
    }
}

/// Cache-aside interceptor for outbound requests.
///
/// Constructed with a cache store, a key generator, and a default TTL
/// (5 seconds unless overridden). The interceptor holds no cache state of
/// its own; everything it touches is an injected, shared collaborator.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use reqcache::http::{Request, Response, StatusCode};
/// use reqcache::key::Sha1UriKey;
/// use reqcache::middleware::{CachedMiddleware, Executor, Options};
/// use reqcache::store::MemoryStore;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store: Arc<MemoryStore<Response>> = Arc::new(MemoryStore::new());
/// let middleware = CachedMiddleware::new(store, Arc::new(Sha1UriKey));
///
/// let upstream: Executor = Arc::new(|_request, _options: Options| {
///     Box::pin(async { Ok(Response::new(StatusCode::Ok).body("fresh")) })
/// });
///
/// let cached = middleware.intercept(upstream);
/// let response = cached(Request::get("http://example.com/a"), Options::new())
///     .await
///     .unwrap();
/// assert_eq!(response.body_ref().as_ref(), b"fresh");
/// # });
/// ```
pub struct CachedMiddleware<S, K> {
    store: Arc<S>,
    keys: Arc<K>,
    default_ttl: Duration,
}

impl<S, K> CachedMiddleware<S, K>
where
    S: CacheStore<Value = Response> + 'static,
    K: CacheKey + 'static,
{
    /// Creates an interceptor with the default TTL of 5 seconds.
    pub fn new(store: Arc<S>, keys: Arc<K>) -> Self {
        Self {
            store,
            keys,
            default_ttl: DEFAULT_CACHE_TIME,
        }
    }

    /// Replaces the default TTL applied when a call carries no
    /// [`CACHE_TIME_IN_S`] option.
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Wraps `upstream` in cache-aside semantics, returning a new [`Executor`].
    ///
    /// For every call, in order:
    ///
    /// 1. Derive the cache key from the request and options.
    /// 2. Look the key up in the store. A hit resolves immediately with the
    ///    cached response; the upstream is **not** invoked.
    /// 3. Resolve the effective TTL: the validated `cache_time` option if
    ///    present, else this interceptor's default. A malformed option
    ///    rejects the call here, before the upstream is contacted. The
    ///    option is only inspected on a miss — a hit short-circuits in
    ///    step 2 and returns the cached response even when the call carries
    ///    a malformed `cache_time`.
    /// 4. Await the upstream with the original request and options.
    /// 5. On success, write `(key, response, ttl)` to the store, then return
    ///    the response unchanged. A store write the backend refuses is
    ///    ignored; the next call for this key is simply another miss.
    /// 6. On failure, return the upstream's error unchanged. The store is
    ///    never written.
    pub fn intercept(&self, upstream: Executor) -> Executor {
        let store = Arc::clone(&self.store);
        let keys = Arc::clone(&self.keys);
        let default_ttl = self.default_ttl;

        Arc::new(move |request: Request, options: Options| {
            let store = Arc::clone(&store);
            let keys = Arc::clone(&keys);
            let upstream = Arc::clone(&upstream);

            Box::pin(async move {
                let cache_key = keys.cache_key(&request, &options);

                if let Some(cached) = store.get(&cache_key) {
                    tracing::debug!(key = %cache_key, "cache hit");
                    return Ok(cached);
                }

                let ttl = options.cache_time()?.unwrap_or(default_ttl);

                tracing::debug!(key = %cache_key, ttl_s = ttl.as_secs(), "cache miss");
                let response = upstream(request, options).await?;

                store.set(&cache_key, response.clone(), ttl);

                Ok(response)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::StatusCode;
    use crate::key::Sha1UriKey;
    use crate::store::MemoryStore;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that records every `set` and answers `get` from a fixed map.
    #[derive(Default)]
    struct RecordingStore {
        preloaded: Mutex<HashMap<String, Response>>,
        sets: Mutex<Vec<(String, Duration)>>,
    }

    impl RecordingStore {
        fn preload(self, key: &str, response: Response) -> Self {
            self.preloaded
                .lock()
                .unwrap()
                .insert(key.to_owned(), response);
            self
        }

        fn recorded_sets(&self) -> Vec<(String, Duration)> {
            self.sets.lock().unwrap().clone()
        }
    }

    impl CacheStore for RecordingStore {
        type Value = Response;

        fn get(&self, key: &str) -> Option<Response> {
            self.preloaded.lock().unwrap().get(key).cloned()
        }

        fn set(&self, key: &str, _value: Response, ttl: Duration) -> bool {
            self.sets.lock().unwrap().push((key.to_owned(), ttl));
            true
        }

        fn delete(&self, _key: &str) -> bool {
            true
        }
        fn clear(&self) -> bool {
            true
        }
        fn get_multiple(&self, keys: &[&str]) -> Vec<Option<Response>> {
            keys.iter().map(|k| self.get(k)).collect()
        }
        fn set_multiple(&self, _entries: Vec<(String, Response)>, _ttl: Duration) -> bool {
            true
        }
        fn delete_multiple(&self, _keys: &[&str]) -> bool {
            true
        }
        fn has(&self, key: &str) -> bool {
            self.get(key).is_some()
        }
    }

    /// Upstream that counts invocations and returns a canned result.
    fn counting_upstream(
        calls: Arc<AtomicUsize>,
        result: fn() -> ExecuteResult,
    ) -> Executor {
        Arc::new(move |_request, _options| {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                result()
            })
        })
    }

    // SHA-1 of "http://example.com/a" — what Sha1UriKey derives for the
    // request used throughout these tests.
    const KEY_A: &str = "555abfee588088d4e8c6a8804c57cfaa0d22510b";

    #[tokio::test]
    async fn hit_short_circuits_upstream() {
        let store = Arc::new(
            RecordingStore::default()
                .preload(KEY_A, Response::new(StatusCode::Ok).body("cached")),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let upstream = counting_upstream(Arc::clone(&calls), || {
            Ok(Response::new(StatusCode::Ok).body("fresh"))
        });

        let middleware = CachedMiddleware::new(Arc::clone(&store), Arc::new(Sha1UriKey));
        let cached = middleware.intercept(upstream);

        let response = cached(Request::get("http://example.com/a"), Options::new())
            .await
            .unwrap();

        assert_eq!(response.body_ref().as_ref(), b"cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store.recorded_sets().is_empty());
    }

    #[tokio::test]
    async fn miss_invokes_upstream_once_and_stores_default_ttl() {
        let store = Arc::new(RecordingStore::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let upstream = counting_upstream(Arc::clone(&calls), || {
            Ok(Response::new(StatusCode::Ok).body("fresh"))
        });

        let middleware = CachedMiddleware::new(Arc::clone(&store), Arc::new(Sha1UriKey));
        let cached = middleware.intercept(upstream);

        let response = cached(Request::get("http://example.com/a"), Options::new())
            .await
            .unwrap();

        assert_eq!(response.body_ref().as_ref(), b"fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.recorded_sets(),
            vec![(KEY_A.to_owned(), Duration::from_secs(5))]
        );
    }

    #[tokio::test]
    async fn cache_time_option_overrides_ttl() {
        let store = Arc::new(RecordingStore::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let upstream =
            counting_upstream(Arc::clone(&calls), || Ok(Response::new(StatusCode::Ok)));

        let middleware = CachedMiddleware::new(Arc::clone(&store), Arc::new(Sha1UriKey));
        let cached = middleware.intercept(upstream);

        cached(
            Request::get("http://example.com/a"),
            Options::new().with(CACHE_TIME_IN_S, 16),
        )
        .await
        .unwrap();

        assert_eq!(
            store.recorded_sets(),
            vec![(KEY_A.to_owned(), Duration::from_secs(16))]
        );
    }

    #[tokio::test]
    async fn constructor_ttl_applies_without_option() {
        let store = Arc::new(RecordingStore::default());
        let upstream = counting_upstream(Arc::new(AtomicUsize::new(0)), || {
            Ok(Response::new(StatusCode::Ok))
        });

        let middleware = CachedMiddleware::new(Arc::clone(&store), Arc::new(Sha1UriKey))
            .with_default_ttl(Duration::from_secs(120));
        let cached = middleware.intercept(upstream);

        cached(Request::get("http://example.com/a"), Options::new())
            .await
            .unwrap();

        assert_eq!(
            store.recorded_sets(),
            vec![(KEY_A.to_owned(), Duration::from_secs(120))]
        );
    }

    #[tokio::test]
    async fn upstream_failure_propagates_without_store_write() {
        let store = Arc::new(RecordingStore::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let upstream = counting_upstream(Arc::clone(&calls), || {
            Err(Error::Transfer(TransferError::Timeout(Duration::from_secs(
                30,
            ))))
        });

        let middleware = CachedMiddleware::new(Arc::clone(&store), Arc::new(Sha1UriKey));
        let cached = middleware.intercept(upstream);

        let result = cached(Request::get("http://example.com/a"), Options::new()).await;

        assert!(matches!(
            result,
            Err(Error::Transfer(TransferError::Timeout(_)))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.recorded_sets().is_empty());
    }

    #[tokio::test]
    async fn malformed_cache_time_rejects_before_upstream() {
        let store = Arc::new(RecordingStore::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let upstream =
            counting_upstream(Arc::clone(&calls), || Ok(Response::new(StatusCode::Ok)));

        let middleware = CachedMiddleware::new(Arc::clone(&store), Arc::new(Sha1UriKey));
        let cached = middleware.intercept(upstream);

        let result = cached(
            Request::get("http://example.com/a"),
            Options::new().with(CACHE_TIME_IN_S, "soon"),
        )
        .await;

        assert!(matches!(result, Err(Error::InvalidCacheTime { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store.recorded_sets().is_empty());
    }

    #[tokio::test]
    async fn hit_wins_over_malformed_cache_time() {
        let store = Arc::new(
            RecordingStore::default()
                .preload(KEY_A, Response::new(StatusCode::Ok).body("cached")),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let upstream =
            counting_upstream(Arc::clone(&calls), || Ok(Response::new(StatusCode::Ok)));

        let middleware = CachedMiddleware::new(Arc::clone(&store), Arc::new(Sha1UriKey));
        let cached = middleware.intercept(upstream);

        // The option is only inspected on a miss; a hit returns first.
        let response = cached(
            Request::get("http://example.com/a"),
            Options::new().with(CACHE_TIME_IN_S, "soon"),
        )
        .await
        .unwrap();

        assert_eq!(response.body_ref().as_ref(), b"cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_cache_time_is_rejected() {
        let options = Options::new().with(CACHE_TIME_IN_S, 0);
        assert!(matches!(
            options.cache_time(),
            Err(Error::InvalidCacheTime { .. })
        ));
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let store: Arc<MemoryStore<Response>> = Arc::new(MemoryStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let upstream = counting_upstream(Arc::clone(&calls), || {
            Ok(Response::new(StatusCode::Ok).body("fresh"))
        });

        let middleware = CachedMiddleware::new(store, Arc::new(Sha1UriKey));
        let cached = middleware.intercept(upstream);

        let request = Request::get("http://example.com/a");
        let first = cached(request.clone(), Options::new()).await.unwrap();
        let second = cached(request, Options::new()).await.unwrap();

        assert_eq!(first.body_ref(), second.body_ref());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn trait_executor_slots_into_the_chain() {
        struct CannedTransport;

        impl RequestExecutor for CannedTransport {
            fn execute(&self, _request: Request, _options: Options) -> BoxFuture<ExecuteResult> {
                Box::pin(async { Ok(Response::new(StatusCode::Ok).body("canned")) })
            }
        }

        let store = Arc::new(RecordingStore::default());
        let middleware = CachedMiddleware::new(Arc::clone(&store), Arc::new(Sha1UriKey));
        let cached = middleware.intercept(from_executor(Arc::new(CannedTransport)));

        let response = cached(Request::get("http://example.com/a"), Options::new())
            .await
            .unwrap();

        assert_eq!(response.body_ref().as_ref(), b"canned");
        assert_eq!(store.recorded_sets().len(), 1);
    }

    #[test]
    fn unrecognized_options_pass_through() {
        let options = Options::new()
            .with("auth_token", "abc")
            .with("attempt", 2);

        assert_eq!(options.cache_time().unwrap(), None);
        assert_eq!(options.get("auth_token").and_then(|v| v.as_str()), Some("abc"));
        assert_eq!(options.get("attempt").and_then(|v| v.as_u64()), Some(2));
    }
}
