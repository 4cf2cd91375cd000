use std::{io, sync::Arc};

use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use url::form_urlencoded;

/// Key accepted by `app()`.
pub const API_KEY: &str = "test-key";

/// Path prefix every route is mounted under.
pub const BASE_PATH: &str = "/rates/api/v1";

/// Quota a fresh app starts with.
pub const INITIAL_QUOTES: u64 = 100_000;

/// Fixed `meta.request_time` of rates responses.
pub const REQUEST_TIME: &str = "2014-05-06T18:27:56+0000";

/// Quote date used when the query has no `date`.
pub const DEFAULT_DATE: &str = "2014-05-06";

/// Precision used when the query has no `decimal_places`.
pub const DEFAULT_DECIMAL_PLACES: usize = 5;

/// Error message for a missing or unknown bearer token.
pub const INVALID_TOKEN_MESSAGE: &str = "Malformed Authorization header or invalid access token";

/// Served by `broken.json`: valid JSON cut off mid-key.
pub const BROKEN_BODY: &str = r#"{"foo":[{"bar":"fubar","fizz"#;

/// Served by `chunked.json` in several pieces.
pub const CHUNKED_BODY: &str = r#"{"country":"Côte d'Ivoire","currency":"XOF"}"#;

/// Known currencies with their value in units per US dollar.
pub const CURRENCIES: &[(&str, &str, f64)] = &[
    ("CAD", "Canadian Dollar", 1.09691),
    ("CHF", "Swiss Franc", 0.88490),
    ("EUR", "Euro", 0.72527),
    ("GBP", "British Pound", 0.60365),
    ("JPY", "Japanese Yen", 102.115),
    ("USD", "US Dollar", 1.0),
    ("XOF", "CFA Franc BCEAO", 475.745),
];

const ALL_FIELDS: [&str; 4] = ["averages", "highs", "lows", "midpoint"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub description: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CurrencyList {
    pub currencies: Vec<Currency>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemainingQuotes {
    pub remaining_quotes: u64,
}

pub type Quota = Arc<RwLock<u64>>;

#[derive(Clone)]
struct MockState {
    api_key: Arc<str>,
    quota: Quota,
}

/// Error body in the API's `{code, message}` shape.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub code: u32,
    pub message: String,
}

impl ApiFailure {
    fn invalid_token() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: 8,
            message: INVALID_TOKEN_MESSAGE.to_string(),
        }
    }

    fn invalid_base() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: 2,
            message: "Invalid base currency".to_string(),
        }
    }

    fn invalid_parameter(name: &str, value: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: 3,
            message: format!("Invalid value {value:?} for parameter {name}"),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = json!({ "code": self.code, "message": self.message });
        (self.status, Json(body)).into_response()
    }
}

pub fn app() -> Router {
    app_with_key(API_KEY)
}

pub fn app_with_key(api_key: &str) -> Router {
    let state = MockState {
        api_key: Arc::from(api_key),
        quota: Arc::new(RwLock::new(INITIAL_QUOTES)),
    };
    Router::new()
        .route(&format!("{BASE_PATH}/currencies.json"), get(currencies))
        .route(
            &format!("{BASE_PATH}/remaining_quotes.json"),
            get(remaining_quotes),
        )
        .route(&format!("{BASE_PATH}/rates/{{file}}"), get(rates))
        .route(&format!("{BASE_PATH}/broken.json"), get(broken))
        .route(&format!("{BASE_PATH}/chunked.json"), get(chunked))
        .route(&format!("{BASE_PATH}/truncated.json"), get(truncated))
        .route(&format!("{BASE_PATH}/headers.json"), get(echo_headers))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_key(listener: TcpListener, api_key: &str) -> Result<(), io::Error> {
    axum::serve(listener, app_with_key(api_key)).await
}

/// The pieces `chunked.json` is streamed in. One boundary falls inside the
/// two-byte `ô`.
pub fn chunked_parts() -> Vec<Vec<u8>> {
    let bytes = CHUNKED_BODY.as_bytes();
    let split = CHUNKED_BODY.find('ô').map_or(bytes.len() / 2, |i| i + 1);
    vec![
        bytes[..4].to_vec(),
        bytes[4..split].to_vec(),
        bytes[split..].to_vec(),
    ]
}

fn authorize(state: &MockState, headers: &HeaderMap) -> Result<(), ApiFailure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match token {
        Some(token) if token == &*state.api_key => Ok(()),
        _ => Err(ApiFailure::invalid_token()),
    }
}

fn lookup(code: &str) -> Option<f64> {
    CURRENCIES
        .iter()
        .find(|(known, _, _)| *known == code)
        .map(|(_, _, per_usd)| *per_usd)
}

async fn currencies(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Json<CurrencyList>, ApiFailure> {
    authorize(&state, &headers)?;
    let currencies = CURRENCIES
        .iter()
        .map(|(code, description, _)| Currency {
            code: code.to_string(),
            description: description.to_string(),
        })
        .collect();
    Ok(Json(CurrencyList { currencies }))
}

async fn remaining_quotes(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Json<RemainingQuotes>, ApiFailure> {
    authorize(&state, &headers)?;
    let remaining_quotes = *state.quota.read().await;
    Ok(Json(RemainingQuotes { remaining_quotes }))
}

/// Parsed rates query string. `quote` and `fields` may repeat.
#[derive(Debug, Default)]
struct RatesParams {
    quote: Vec<String>,
    fields: Vec<String>,
    date: Option<String>,
    decimal_places: Option<usize>,
}

impl RatesParams {
    fn parse(raw: Option<&str>) -> Result<Self, ApiFailure> {
        let mut params = RatesParams::default();
        let Some(raw) = raw else {
            return Ok(params);
        };
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match &*key {
                "quote" => params.quote.push(value.into_owned()),
                "fields" => {
                    if value == "all" {
                        params.fields.extend(ALL_FIELDS.iter().map(|f| f.to_string()));
                    } else if ALL_FIELDS.iter().any(|f| *f == value) {
                        params.fields.push(value.into_owned());
                    } else {
                        return Err(ApiFailure::invalid_parameter("fields", &value));
                    }
                }
                "date" => params.date = Some(value.into_owned()),
                "decimal_places" => {
                    let places = value
                        .parse::<usize>()
                        .ok()
                        .filter(|p| *p <= 14)
                        .ok_or_else(|| ApiFailure::invalid_parameter("decimal_places", &value))?;
                    params.decimal_places = Some(places);
                }
                _ => {}
            }
        }
        Ok(params)
    }
}

async fn rates(
    State(state): State<MockState>,
    Path(file): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiFailure> {
    authorize(&state, &headers)?;
    let base = file.strip_suffix(".json").ok_or_else(ApiFailure::invalid_base)?;
    let base_per_usd = lookup(base).ok_or_else(ApiFailure::invalid_base)?;
    let params = RatesParams::parse(query.as_deref())?;
    debug!("rates for {base} with {params:?}");

    let requested: Vec<String> = if params.quote.is_empty() {
        CURRENCIES
            .iter()
            .map(|(code, _, _)| code.to_string())
            .filter(|code| code != base)
            .collect()
    } else {
        params.quote
    };
    let mut fields: Vec<String> = Vec::new();
    for field in params.fields {
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    if fields.is_empty() {
        fields.push("averages".to_string());
    }
    let date = params.date.unwrap_or_else(|| DEFAULT_DATE.to_string());
    let places = params.decimal_places.unwrap_or(DEFAULT_DECIMAL_PLACES);

    let mut quotes = Map::new();
    let mut served = Vec::new();
    let mut skipped = Vec::new();
    for code in requested {
        let Some(quote_per_usd) = lookup(&code) else {
            skipped.push(code);
            continue;
        };
        let mid = quote_per_usd / base_per_usd;
        quotes.insert(code.clone(), quote_entry(mid, &fields, &date, places));
        served.push(code);
    }

    {
        let mut quota = state.quota.write().await;
        *quota = quota.saturating_sub(served.len() as u64);
    }

    Ok(Json(json!({
        "base_currency": base,
        "quotes": quotes,
        "meta": {
            "skipped_currencies": skipped,
            "request_time": REQUEST_TIME,
            "effective_params": {
                "quote_currencies": served,
                "fields": fields,
                "decimal_places": places,
                "date": date,
            },
        },
    })))
}

fn quote_entry(mid: f64, fields: &[String], date: &str, places: usize) -> Value {
    let bid = mid * 0.99986;
    let ask = mid * 1.00014;
    let price = |value: f64| Value::String(format!("{value:.places$}"));

    let mut entry = Map::new();
    entry.insert("date".to_string(), Value::String(format!("{date}T21:00:00+0000")));
    for field in fields {
        match field.as_str() {
            "averages" => {
                entry.insert("bid".to_string(), price(bid));
                entry.insert("ask".to_string(), price(ask));
            }
            "midpoint" => {
                entry.insert("midpoint".to_string(), price(mid));
            }
            "highs" => {
                entry.insert("high_bid".to_string(), price(bid * 1.0005));
                entry.insert("high_ask".to_string(), price(ask * 1.0005));
            }
            "lows" => {
                entry.insert("low_bid".to_string(), price(bid * 0.9995));
                entry.insert("low_ask".to_string(), price(ask * 0.9995));
            }
            _ => {}
        }
    }
    Value::Object(entry)
}

async fn broken(State(state): State<MockState>, headers: HeaderMap) -> Result<Response, ApiFailure> {
    authorize(&state, &headers)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], BROKEN_BODY).into_response())
}

async fn chunked(State(state): State<MockState>, headers: HeaderMap) -> Result<Response, ApiFailure> {
    authorize(&state, &headers)?;
    let parts = chunked_parts()
        .into_iter()
        .map(|part| Ok::<_, io::Error>(Bytes::from(part)));
    let body = Body::from_stream(futures::stream::iter(parts));
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Sends the first chunk, then aborts the stream.
async fn truncated(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Response, ApiFailure> {
    authorize(&state, &headers)?;
    let first = chunked_parts().into_iter().next().unwrap_or_default();
    let parts = vec![
        Ok(Bytes::from(first)),
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "stream aborted")),
    ];
    let body = Body::from_stream(futures::stream::iter(parts));
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Echoes the client-identifying request headers.
async fn echo_headers(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiFailure> {
    authorize(&state, &headers)?;
    let value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    Ok(Json(json!({
        "user_agent": value(header::USER_AGENT),
        "accept": value(header::ACCEPT),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_parts_reassemble_to_body() {
        let parts = chunked_parts();
        assert_eq!(parts.len(), 3);
        let joined: Vec<u8> = parts.concat();
        assert_eq!(joined, CHUNKED_BODY.as_bytes());
    }

    #[test]
    fn chunked_parts_split_a_multibyte_character() {
        let parts = chunked_parts();
        assert!(std::str::from_utf8(&parts[1]).is_err());
        assert!(std::str::from_utf8(&parts[2]).is_err());
    }

    #[test]
    fn params_keep_repeated_quotes_in_order() {
        let params = RatesParams::parse(Some("quote=EUR&quote=GBP&fields=all&date=2014-01-01"))
            .unwrap();
        assert_eq!(params.quote, vec!["EUR", "GBP"]);
        assert_eq!(params.fields, ALL_FIELDS.to_vec());
        assert_eq!(params.date.as_deref(), Some("2014-01-01"));
        assert!(params.decimal_places.is_none());
    }

    #[test]
    fn params_reject_unknown_fields() {
        let err = RatesParams::parse(Some("fields=everything")).unwrap_err();
        assert_eq!(err.code, 3);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn params_reject_bad_decimal_places() {
        assert!(RatesParams::parse(Some("decimal_places=many")).is_err());
        assert!(RatesParams::parse(Some("decimal_places=15")).is_err());
        let params = RatesParams::parse(Some("decimal_places=2")).unwrap();
        assert_eq!(params.decimal_places, Some(2));
    }

    #[test]
    fn quote_entry_formats_requested_fields() {
        let fields = vec!["midpoint".to_string()];
        let entry = quote_entry(1.5, &fields, "2014-01-01", 3);
        assert_eq!(entry["midpoint"], "1.500");
        assert_eq!(entry["date"], "2014-01-01T21:00:00+0000");
        assert!(entry.get("bid").is_none());
    }

    #[test]
    fn currency_list_serializes_in_api_shape() {
        let list = CurrencyList {
            currencies: vec![Currency {
                code: "ADF".to_string(),
                description: "Andorran Franc".to_string(),
            }],
        };
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["currencies"][0]["code"], "ADF");
        assert_eq!(json["currencies"][0]["description"], "Andorran Franc");
    }
}
