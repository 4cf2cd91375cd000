//! Request arguments and typed payload views for the rates API.
//!
//! # Design
//! `RatesRequest` replaces the loosely shaped "base currency or options"
//! argument with a tagged variant. The payload structs are optional typed
//! views over `ApiResult::data`; the envelope itself stays untyped so the
//! caller always sees the body the server actually sent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Arguments for the rates endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RatesRequest {
    /// Only the base currency; the server picks every other parameter.
    Base(String),
    /// A base currency plus optional query parameters.
    Query(RatesQuery),
}

impl RatesRequest {
    pub fn base(&self) -> &str {
        match self {
            RatesRequest::Base(base) => base,
            RatesRequest::Query(query) => &query.base,
        }
    }

    /// Query parameters in wire order. Empty for `Base`.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            RatesRequest::Base(_) => Vec::new(),
            RatesRequest::Query(query) => query.pairs(),
        }
    }
}

impl From<&str> for RatesRequest {
    fn from(base: &str) -> Self {
        RatesRequest::Base(base.to_string())
    }
}

impl From<String> for RatesRequest {
    fn from(base: String) -> Self {
        RatesRequest::Base(base)
    }
}

impl From<RatesQuery> for RatesRequest {
    fn from(query: RatesQuery) -> Self {
        RatesRequest::Query(query)
    }
}

/// Optional parameters for a rates query.
///
/// `quote` and `fields` serialize as one `key=value` pair per entry, in the
/// order given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatesQuery {
    pub base: String,
    #[serde(default)]
    pub quote: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub decimal_places: Option<u8>,
}

impl RatesQuery {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    pub fn quote(mut self, currency: impl Into<String>) -> Self {
        self.quote.push(currency.into());
        self
    }

    pub fn quotes<I, S>(mut self, currencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.quote.extend(currencies.into_iter().map(Into::into));
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn decimal_places(mut self, places: u8) -> Self {
        self.decimal_places = Some(places);
        self
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs: Vec<(&'static str, String)> = Vec::new();
        pairs.extend(self.quote.iter().map(|q| ("quote", q.clone())));
        pairs.extend(self.fields.iter().map(|f| ("fields", f.clone())));
        if let Some(date) = &self.date {
            pairs.push(("date", date.clone()));
        }
        if let Some(places) = self.decimal_places {
            pairs.push(("decimal_places", places.to_string()));
        }
        pairs
    }
}

/// One entry of the currencies endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub description: String,
}

/// Body of the currencies endpoint as sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyList {
    pub currencies: Vec<Currency>,
}

/// Body of the remaining-quotes endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingQuotes {
    pub remaining_quotes: u64,
}

/// Body of the rates endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatesResponse {
    pub base_currency: String,
    pub quotes: BTreeMap<String, Quote>,
    pub meta: RatesMeta,
}

/// Prices for one quote currency. Which fields are present depends on the
/// `fields` parameter of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_bid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_ask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_bid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_ask: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatesMeta {
    #[serde(default)]
    pub skipped_currencies: Vec<String>,
    pub request_time: String,
    pub effective_params: EffectiveParams,
}

/// Parameters the server actually applied to a rates query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveParams {
    pub quote_currencies: Vec<String>,
    pub fields: Vec<String>,
    pub decimal_places: u8,
    pub date: String,
}
