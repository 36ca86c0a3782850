//! HTTP/1.1 response parsing and construction.
//!
//! Upstream responses arrive as raw bytes and are parsed with the
//! [`httparse`] crate. A builder API is also provided so executors and tests
//! can construct responses directly.

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, StatusCode};

/// Errors that can occur while parsing an HTTP/1.1 response.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response is incomplete — more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("unrecognized status code: {code}")]
    UnknownStatus { code: u16 },
}

/// An HTTP/1.1 response received from an upstream executor.
///
/// Cloning is cheap: the body is a reference-counted [`Bytes`] buffer. This
/// matters because cached responses are cloned out of the store on every hit.
///
/// # Examples
///
/// ```
/// use reqcache::http::Response;
///
/// let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nhello";
/// let (response, body_offset) = Response::parse(raw).unwrap();
///
/// assert_eq!(response.status().as_u16(), 200);
/// assert_eq!(response.headers().get("content-type"), Some("text/plain"));
/// assert_eq!(&raw[body_offset..], b"hello");
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
}

impl Response {
    /// Maximum number of headers we support per response.
    const MAX_HEADERS: usize = 64;

    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Appends a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Sets the response body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Bytes::from(body.into().into_bytes());
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Parse a raw HTTP/1.1 response from a byte slice.
    ///
    /// Returns the parsed `Response` and the byte offset at which the body
    /// begins in `buf` (i.e. immediately after the `\r\n\r\n` header
    /// terminator). Bytes from that offset to the end of `buf` become the
    /// response body.
    ///
    /// # Errors
    ///
    /// - [`ResponseError::Incomplete`] — more data is needed to complete the
    ///   status line and headers.
    /// - [`ResponseError::Parse`] — the data is malformed.
    /// - [`ResponseError::MissingField`] — the status code is absent.
    /// - [`ResponseError::UnknownStatus`] — the status code is not one this
    ///   model enumerates.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), ResponseError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw = httparse::Response::new(&mut headers);

        let body_offset = match raw.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(ResponseError::Incomplete),
        };

        let code = raw
            .code
            .ok_or(ResponseError::MissingField { field: "status" })?;
        let status =
            StatusCode::from_u16(code).ok_or(ResponseError::UnknownStatus { code })?;

        let mut header_map = Headers::with_capacity(raw.headers.len());
        for header in raw.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        let body = Bytes::copy_from_slice(&buf[body_offset..]);

        Ok((
            Self {
                status,
                headers: header_map,
                body,
            },
            body_offset,
        ))
    }

    /// Returns the response status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the response body bytes.
    pub fn body_ref(&self) -> &Bytes {
        &self.body
    }

    /// Returns the value of the `Content-Length` header parsed as a `usize`,
    /// if present.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.parse().ok()
    }

    /// Deserializes the response body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(&self.body)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_ok() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        let (resp, offset) = Response::parse(raw).unwrap();
        assert_eq!(resp.status(), StatusCode::Ok);
        assert_eq!(resp.content_length(), Some(5));
        assert_eq!(resp.body_ref().as_ref(), b"hello");
        assert_eq!(&raw[offset..], b"hello");
    }

    #[test]
    fn parse_no_body() {
        let raw = b"HTTP/1.1 204 No Content\r\n\r\n";
        let (resp, offset) = Response::parse(raw).unwrap();
        assert_eq!(resp.status(), StatusCode::NoContent);
        assert!(resp.body_ref().is_empty());
        assert_eq!(offset, raw.len());
    }

    #[test]
    fn incomplete_response() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type:";
        assert!(matches!(
            Response::parse(raw),
            Err(ResponseError::Incomplete)
        ));
    }

    #[test]
    fn unknown_status() {
        let raw = b"HTTP/1.1 418 I'm a teapot\r\n\r\n";
        assert!(matches!(
            Response::parse(raw),
            Err(ResponseError::UnknownStatus { code: 418 })
        ));
    }

    #[test]
    fn json_body() {
        let resp = Response::new(StatusCode::Ok).body(r#"{"name":"widget","count":3}"#);
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["name"], "widget");
        assert_eq!(value["count"], 3);
    }

    #[test]
    fn clone_shares_body() {
        let resp = Response::new(StatusCode::Ok).body("shared");
        let copy = resp.clone();
        assert_eq!(copy.body_ref(), resp.body_ref());
    }
}
