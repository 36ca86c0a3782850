//! # reqcache
//!
//! Cache-aside middleware for outbound HTTP requests.
//!
//! The crate has three moving parts: a pluggable cache-key strategy
//! ([`key::CacheKey`]), an interceptor that wraps an upstream executor with
//! check-cache / call-upstream / conditionally-store semantics
//! ([`middleware::CachedMiddleware`]), and a logging decorator over any
//! key-value store ([`logger::LoggedCache`]). The HTTP transport and the
//! cache backend are injected; this crate owns neither.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use reqcache::http::{Request, Response, StatusCode};
//! use reqcache::key::Sha1UriKey;
//! use reqcache::middleware::{CachedMiddleware, Executor, Options};
//! use reqcache::store::MemoryStore;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store: Arc<MemoryStore<Response>> = Arc::new(MemoryStore::new());
//! let middleware = CachedMiddleware::new(store, Arc::new(Sha1UriKey));
//!
//! // Stand-in for a real transport.
//! let upstream: Executor = Arc::new(|_request, _options: Options| {
//!     Box::pin(async { Ok(Response::new(StatusCode::Ok).body("fresh")) })
//! });
//!
//! let cached = middleware.intercept(upstream);
//! let response = cached(Request::get("http://example.com/users"), Options::new())
//!     .await
//!     .unwrap();
//! assert_eq!(response.status(), StatusCode::Ok);
//! # });
//! ```

pub mod http;
pub mod key;
pub mod logger;
pub mod middleware;
pub mod store;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use key::{CacheKey, Sha1UriKey};
pub use logger::{Level, LoggedCache, MessageSink};
pub use middleware::{CachedMiddleware, Error, Executor, Options, TransferError};
pub use store::{CacheStore, MemoryStore};
