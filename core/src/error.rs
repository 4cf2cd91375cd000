//! Error types for the exchange-rates client.
//!
//! # Design
//! Only construction can fail with a `Result`. Everything that goes wrong
//! once a request is in flight is reported inside an `ApiResult`, so
//! `TransportError` is an input to the normalizer rather than something the
//! async operations return.

use std::error::Error as StdError;

use thiserror::Error;

/// Errors returned while building an `ExchangeRatesClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No API key, or a blank one, was configured.
    #[error("No API key specified")]
    MissingApiKey,

    /// The base URL does not parse or cannot carry path segments.
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The proxy URL was rejected by the HTTP stack.
    #[error("invalid proxy URL {url:?}: {reason}")]
    InvalidProxy { url: String, reason: String },

    /// The underlying HTTP client could not be initialized.
    #[error("unable to build HTTP client: {0}")]
    HttpClient(String),
}

/// A connection or stream failure for a single request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be sent or no response head arrived.
    #[error("{0}")]
    Send(String),

    /// The connection broke while the body was being received.
    #[error("{0}")]
    Body(String),
}

impl TransportError {
    pub(crate) fn send(err: &reqwest::Error) -> Self {
        TransportError::Send(describe(err))
    }

    pub(crate) fn body(err: &reqwest::Error) -> Self {
        TransportError::Body(describe(err))
    }
}

/// Render an error followed by its source chain.
pub(crate) fn describe(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.ends_with(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Leaf;

    impl fmt::Display for Leaf {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "connection refused")
        }
    }

    impl StdError for Leaf {}

    #[derive(Debug)]
    struct Outer(Leaf);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "error sending request")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn describe_joins_source_chain() {
        assert_eq!(describe(&Outer(Leaf)), "error sending request: connection refused");
    }

    #[test]
    fn missing_api_key_message() {
        assert_eq!(ClientError::MissingApiKey.to_string(), "No API key specified");
    }

    #[test]
    fn transport_error_displays_description_only() {
        let err = TransportError::Send("connect failed".to_string());
        assert_eq!(err.to_string(), "connect failed");
    }
}
