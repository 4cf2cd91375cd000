//! Async client core for a currency exchange-rate API.
//!
//! # Overview
//! Builds authenticated GET requests, runs them through a proxy-aware
//! reqwest transport, and normalizes every outcome (success, API error,
//! malformed JSON, transport failure) into one `ApiResult`.
//!
//! # Design
//! - `ExchangeRatesClient` holds the API key, base URL and resolved proxy;
//!   nothing is shared between requests.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes the exchange), with async `get_*` methods that run
//!   both around the bundled transport.
//! - Bodies are accumulated in full before the normalizer runs, so chunk
//!   boundaries never affect the result.
//! - Only construction returns `Err`; request failures live in the result.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod result;
pub mod transport;
pub mod types;

pub use client::{ExchangeRatesClient, USER_AGENT};
pub use config::{ClientConfig, Environment, SystemEnvironment, DEFAULT_BASE_URL};
pub use error::{ClientError, TransportError};
pub use http::{BodyAccumulator, HttpRequest, HttpResponse};
pub use normalize::{normalize, normalize_currencies};
pub use result::ApiResult;
pub use transport::HttpTransport;
pub use types::{
    Currency, CurrencyList, EffectiveParams, Quote, RatesMeta, RatesQuery, RatesRequest,
    RatesResponse, RemainingQuotes,
};
