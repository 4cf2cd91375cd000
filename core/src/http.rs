//! HTTP exchange types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `ExchangeRatesClient` builds
//! `HttpRequest` values and normalizes `HttpResponse` values; whoever runs
//! the round-trip (the bundled reqwest transport, or the caller's own stack)
//! feeds body chunks into a `BodyAccumulator` and hands the finished response
//! back. Chunk boundaries never reach the normalizer.

/// A GET request described as plain data.
///
/// `url` is absolute and already carries the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A fully received response with its body decoded as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Collects the body of one response as its chunks arrive.
///
/// Bytes are decoded only in `finish`, so a multi-byte character split
/// across two chunks comes out intact.
#[derive(Debug)]
pub struct BodyAccumulator {
    status: u16,
    bytes: Vec<u8>,
}

impl BodyAccumulator {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            bytes: Vec::new(),
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Close the stream. Invalid UTF-8 is replaced with U+FFFD.
    pub fn finish(self) -> HttpResponse {
        let body = match String::from_utf8(self.bytes) {
            Ok(body) => body,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        };
        HttpResponse {
            status: self.status,
            body,
        }
    }
}
