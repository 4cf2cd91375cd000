//! Request builders, normalizers and async operations for the rates API.
//!
//! # Design
//! `ExchangeRatesClient` keeps a split between `build_*`
//! (produce an `HttpRequest`) and `parse_*` (consume the exchange), so a
//! caller with its own HTTP stack can drive the API without this crate's
//! transport. The async `get_*` methods chain build, execute and parse for
//! the common case. Every path ends in exactly one `ApiResult`.
//!
//! Endpoint names carry the `.json` suffix and the query string follows it:
//! `<base>/rates/USD.json?quote=EUR&quote=GBP`.

use log::debug;
use url::form_urlencoded;
use url::Url;

use crate::config::{ClientConfig, Environment, SystemEnvironment};
use crate::error::{ClientError, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::normalize::{normalize, normalize_currencies};
use crate::result::ApiResult;
use crate::transport::HttpTransport;
use crate::types::RatesRequest;

/// Value of the `User-Agent` header sent with every request.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const CURRENCIES: &str = "currencies.json";
const REMAINING_QUOTES: &str = "remaining_quotes.json";

/// Client for the exchange rates API.
///
/// Holds no per-request state, so one instance can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct ExchangeRatesClient {
    api_key: String,
    base_url: Url,
    proxy: Option<String>,
    transport: HttpTransport,
}

impl ExchangeRatesClient {
    /// Build a client, falling back to the process environment for the proxy.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::with_environment(config, &SystemEnvironment)
    }

    /// Build a client with an explicit environment for proxy resolution.
    ///
    /// Fails before any request is attempted when the API key is missing.
    pub fn with_environment(
        config: ClientConfig,
        env: &dyn Environment,
    ) -> Result<Self, ClientError> {
        let api_key = config.api_key().ok_or(ClientError::MissingApiKey)?.to_string();
        let base_url = parse_base_url(&config.base_url)?;
        let proxy = config.resolve_proxy(env);
        if let Some(proxy) = &proxy {
            debug!("routing requests through proxy {proxy}");
        }
        let transport = HttpTransport::new(proxy.as_deref())?;
        Ok(Self {
            api_key,
            base_url,
            proxy,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// The proxy resolved at construction, if any.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn user_agent(&self) -> &'static str {
        USER_AGENT
    }

    /// Build a GET for an endpoint path relative to the base URL, such as
    /// `currencies.json` or `rates/USD.json`. Anything after the first `?`
    /// is sent as the query string unchanged.
    pub fn build_request(&self, endpoint: &str) -> HttpRequest {
        let (path, query) = match endpoint.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (endpoint, None),
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        self.request_for(&segments, query)
    }

    pub fn build_currencies(&self) -> HttpRequest {
        self.build_request(CURRENCIES)
    }

    pub fn build_remaining_quotes(&self) -> HttpRequest {
        self.build_request(REMAINING_QUOTES)
    }

    pub fn build_rates(&self, request: &RatesRequest) -> HttpRequest {
        let file = format!("{}.json", request.base());
        let pairs = request.query_pairs();
        let query = if pairs.is_empty() {
            None
        } else {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (key, value) in &pairs {
                serializer.append_pair(key, value);
            }
            Some(serializer.finish())
        };
        self.request_for(&["rates", file.as_str()], query)
    }

    /// Normalize the currencies exchange into a `code -> description` map.
    pub fn parse_currencies(&self, exchange: Result<HttpResponse, TransportError>) -> ApiResult {
        normalize_currencies(exchange)
    }

    pub fn parse_remaining_quotes(
        &self,
        exchange: Result<HttpResponse, TransportError>,
    ) -> ApiResult {
        normalize(exchange)
    }

    pub fn parse_rates(&self, exchange: Result<HttpResponse, TransportError>) -> ApiResult {
        normalize(exchange)
    }

    /// GET an arbitrary endpoint and normalize the response.
    pub async fn fetch(&self, endpoint: &str) -> ApiResult {
        let request = self.build_request(endpoint);
        normalize(self.transport.execute(&request).await)
    }

    pub async fn get_currencies(&self) -> ApiResult {
        let request = self.build_currencies();
        self.parse_currencies(self.transport.execute(&request).await)
    }

    pub async fn get_remaining_quotes(&self) -> ApiResult {
        let request = self.build_remaining_quotes();
        self.parse_remaining_quotes(self.transport.execute(&request).await)
    }

    /// Query rates for a base currency, either bare (`"USD"`) or with a
    /// `RatesQuery`.
    pub async fn get_rates(&self, request: impl Into<RatesRequest>) -> ApiResult {
        let request = self.build_rates(&request.into());
        self.parse_rates(self.transport.execute(&request).await)
    }

    fn request_for(&self, segments: &[&str], query: Option<String>) -> HttpRequest {
        let mut url = self.base_url.clone();
        // `parse_base_url` rejects bases that cannot take segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.set_query(query.as_deref());
        HttpRequest {
            url: url.into(),
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {}", self.api_key)),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let invalid = |reason: String| ClientError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|err| invalid(err.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot carry path segments".to_string()));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    Ok(url)
}
