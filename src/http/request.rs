//! Outbound HTTP/1.1 request builder.
//!
//! Provides a fluent builder for constructing client requests and serializing
//! them to a byte buffer for transmission over TCP. The absolute URI is kept
//! verbatim — cache-key derivation hashes it exactly as given.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Headers, Method};

/// An outbound HTTP/1.1 request.
///
/// # Examples
///
/// ```
/// use reqcache::http::{Method, Request};
///
/// let request = Request::new(Method::Get, "http://example.com/users?page=2")
///     .header("Accept", "application/json");
///
/// assert_eq!(request.uri(), "http://example.com/users?page=2");
///
/// let bytes = request.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("GET /users?page=2 HTTP/1.1\r\n"));
/// assert!(text.contains("Host: example.com\r\n"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: String,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Creates a new request with the given method and absolute URI and an
    /// empty body.
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a GET request.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(Method::Get, uri)
    }

    /// Shorthand for a POST request.
    pub fn post(uri: impl Into<String>) -> Self {
        Self::new(Method::Post, uri)
    }

    /// Appends a request header. Repeated calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the request body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Bytes::from(body.into().into_bytes());
        self
    }

    /// Sets the request body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI exactly as supplied at construction.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request body bytes.
    pub fn body_ref(&self) -> &Bytes {
        &self.body
    }

    /// Returns the origin-form request target: path plus query, without
    /// scheme or authority. A URI with no path component yields `/`.
    pub fn target(&self) -> &str {
        target_of(&self.uri)
    }

    /// Returns the authority (host and optional port) from the URI, if the
    /// URI is in absolute form.
    pub fn authority(&self) -> Option<&str> {
        authority_of(&self.uri)
    }

    /// Serializes the request into a `BytesMut` buffer using HTTP/1.1 wire
    /// format.
    ///
    /// Automatically adds:
    /// - `Host: <authority>` when the URI is absolute and no `Host` header
    ///   was set.
    /// - `Content-Length: <n>` (always written, last before the blank line).
    pub fn into_bytes(self) -> BytesMut {
        let content_length = self.body.len();
        let mut headers = self.headers;

        if !headers.contains("host") {
            if let Some(authority) = authority_of(&self.uri) {
                headers.set("Host", authority);
            }
        }

        let estimated_size = 64 + headers.len() * 48 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        // Request line
        buf.put(format!("{} {} HTTP/1.1\r\n", self.method, target_of(&self.uri)).as_bytes());

        // Headers
        for (name, value) in headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());

        // Header/body separator
        buf.put(&b"\r\n"[..]);

        if !self.body.is_empty() {
            buf.put(self.body.as_ref());
        }

        buf
    }
}

fn target_of(uri: &str) -> &str {
    let rest = uri.split_once("://").map(|(_, rest)| rest).unwrap_or(uri);
    match rest.find('/') {
        Some(pos) => &rest[pos..],
        None => "/",
    }
}

fn authority_of(uri: &str) -> Option<&str> {
    let (_, rest) = uri.split_once("://")?;
    let end = rest.find('/').unwrap_or(rest.len());
    let authority = &rest[..end];
    (!authority.is_empty()).then_some(authority)
}
