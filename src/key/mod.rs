//! Cache-key derivation.
//!
//! A cache key is a deterministic function of the request: the same logical
//! request must map to the same key across calls and process restarts, since
//! keys outlive the process in shared backends. No collision resistance is
//! promised beyond that of the digest.

use std::sync::{Arc, RwLock};

use sha1::{Digest, Sha1};

use crate::http::Request;
use crate::logger::{Level, MessageSink};
use crate::middleware::Options;

/// Derives a stable cache key for an outbound request.
///
/// Implementations must be infallible for any well-formed request and
/// referentially stable. Alternate strategies (method-aware, header-aware)
/// implement the same trait and slot into [`CachedMiddleware`] unchanged.
///
/// [`CachedMiddleware`]: crate::middleware::CachedMiddleware
pub trait CacheKey: Send + Sync {
    /// Returns the cache key for `request`.
    ///
    /// `options` is available so strategies can vary the key per call;
    /// the default strategy ignores it.
    fn cache_key(&self, request: &Request, options: &Options) -> String;
}

/// The default key strategy: hex-encoded SHA-1 digest of the request URI.
///
/// Only the URI participates. Two requests to the same URI share a key
/// regardless of method, headers, or body.
///
/// # Examples
///
/// ```
/// use reqcache::http::Request;
/// use reqcache::key::{CacheKey, Sha1UriKey};
/// use reqcache::middleware::Options;
///
/// let request = Request::get("test-uri");
/// let key = Sha1UriKey.cache_key(&request, &Options::new());
/// assert_eq!(key, "fcbff5b9b8d1b7ceda02676341f12000d2630925");
/// ```
pub struct Sha1UriKey;

impl CacheKey for Sha1UriKey {
    fn cache_key(&self, request: &Request, _options: &Options) -> String {
        hex::encode(Sha1::digest(request.uri().as_bytes()))
    }
}

/// Wrapper that logs every key derivation of an inner [`CacheKey`].
///
/// With a sink attached, one `info` event is emitted per call carrying the
/// derived key and the source URI. The wrapper is a passive observer: the
/// returned key is always exactly the inner strategy's key, and with no
/// sink attached no event is emitted.
pub struct LoggedKey<K> {
    inner: K,
    sink: RwLock<Option<Arc<dyn MessageSink>>>,
}

impl<K> LoggedKey<K> {
    /// Wraps a key strategy with no sink attached.
    pub fn new(inner: K) -> Self {
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
}

impl<K: CacheKey> CacheKey for LoggedKey<K> {
    fn cache_key(&self, request: &Request, options: &Options) -> String {
        let key = self.inner.cache_key(request, options);

        let sink = match self.sink.read() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        if let Some(sink) = sink {
            sink.log(
                Level::Info,
                &format!("derived cache key \"{key}\" for uri \"{}\"", request.uri()),
                &[("key", key.clone()), ("uri", request.uri().to_owned())],
            );
        }

        key
    }
}
