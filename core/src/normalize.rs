//! Turns a finished HTTP exchange into an `ApiResult`.
//!
//! # Design
//! `normalize` is the single place where status codes, bodies and transport
//! failures are interpreted. It runs once per request, after the body has
//! been fully accumulated, so chunking can never change the outcome. The
//! endpoint-specific normalizers are thin reshapes of its output.

use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::http::HttpResponse;
use crate::result::ApiResult;
use crate::types::CurrencyList;

/// Map a completed exchange to the result envelope.
///
/// - transport failure: no status, raw body or data
/// - unparseable body: status and raw body, no error code
/// - status 200 with JSON: success
/// - any other status with JSON: `code` and `message` from the body
pub fn normalize(exchange: Result<HttpResponse, TransportError>) -> ApiResult {
    let response = match exchange {
        Ok(response) => response,
        Err(err) => return ApiResult::transport_failure(format!("Problem with response: {err}")),
    };

    let parsed: Value = match serde_json::from_str(&response.body) {
        Ok(parsed) => parsed,
        Err(err) => {
            return ApiResult::invalid_body(
                response.status,
                response.body,
                format!("Unable to parse JSON data: {err}"),
            );
        }
    };

    if response.status == 200 {
        return ApiResult::success(response.status, response.body, parsed);
    }

    let error_code = parsed.get("code").cloned();
    let error_message = match parsed.get("message") {
        Some(Value::String(message)) => message.clone(),
        Some(other) => other.to_string(),
        None => format!("Unexpected HTTP status {}", response.status),
    };
    ApiResult::api_error(response.status, response.body, error_code, error_message)
}

/// Normalize a currencies response and flatten its list into a
/// `code -> description` object. Later duplicates overwrite earlier ones.
pub fn normalize_currencies(exchange: Result<HttpResponse, TransportError>) -> ApiResult {
    normalize(exchange).try_map_data(|data| {
        let list: CurrencyList = serde_json::from_value(data)
            .map_err(|err| format!("Unable to parse currency list: {err}"))?;
        let map: Map<String, Value> = list
            .currencies
            .into_iter()
            .map(|currency| (currency.code, Value::String(currency.description)))
            .collect();
        Ok(Value::Object(map))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::http::BodyAccumulator;

    const FOO: &str = r#"{"foo":[{"bar":"fubar","fizzy":"fish"}]}"#;
    const BAD_TOKEN: &str =
        r#"{"code":8,"message":"Malformed Authorization header or invalid access token"}"#;

    fn ok(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse::new(status, body))
    }

    #[test]
    fn status_200_with_json_is_success() {
        let result = normalize(ok(200, FOO));
        assert!(result.is_success());
        assert_eq!(result.status_code(), Some(200));
        assert_eq!(result.raw(), Some(FOO));
        assert_eq!(result.data(), Some(&json!({"foo": [{"bar": "fubar", "fizzy": "fish"}]})));
        assert!(result.error_code().is_none());
        assert!(result.error_message().is_none());
    }

    #[test]
    fn chunk_boundaries_do_not_change_the_result() {
        let single = normalize(ok(200, FOO));
        let bytes = FOO.as_bytes();
        for split in 1..bytes.len() {
            let mut acc = BodyAccumulator::new(200);
            acc.push(&bytes[..split]);
            acc.push(&bytes[split..]);
            assert_eq!(normalize(Ok(acc.finish())), single, "split at {split}");
        }
    }

    #[test]
    fn api_error_fields_come_from_body() {
        let result = normalize(ok(400, BAD_TOKEN));
        assert!(!result.is_success());
        assert_eq!(result.status_code(), Some(400));
        assert_eq!(result.error_code(), Some(&json!(8)));
        assert_eq!(
            result.error_message(),
            Some("Malformed Authorization header or invalid access token")
        );
        assert_eq!(result.raw(), Some(BAD_TOKEN));
        assert!(result.data().is_none());
    }

    #[test]
    fn only_200_counts_as_success() {
        for status in [201, 204, 301, 404, 500] {
            let result = normalize(ok(status, r#"{"ok":true}"#));
            assert!(!result.is_success(), "status {status}");
            assert_eq!(
                result.error_message(),
                Some(format!("Unexpected HTTP status {status}").as_str())
            );
            assert!(result.error_code().is_none());
        }
    }

    #[test]
    fn non_string_message_is_rendered_as_json() {
        let result = normalize(ok(500, r#"{"code":"E1","message":{"detail":"x"}}"#));
        assert_eq!(result.error_code(), Some(&json!("E1")));
        assert_eq!(result.error_message(), Some(r#"{"detail":"x"}"#));
    }

    #[test]
    fn malformed_json_reports_parse_failure() {
        let body = r#"{"foo":[{"bar":"fubar","fizz"#;
        let result = normalize(ok(200, body));
        assert!(!result.is_success());
        assert_eq!(result.status_code(), Some(200));
        assert_eq!(result.raw(), Some(body));
        assert!(result.error_code().is_none());
        assert!(result.data().is_none());
        assert!(result
            .error_message()
            .unwrap()
            .starts_with("Unable to parse JSON data:"));
    }

    #[test]
    fn malformed_json_wins_over_error_status() {
        let result = normalize(ok(502, "<html>Bad Gateway</html>"));
        assert!(result.error_code().is_none());
        assert!(result
            .error_message()
            .unwrap()
            .starts_with("Unable to parse JSON data:"));
    }

    #[test]
    fn empty_body_is_a_parse_failure() {
        let result = normalize(ok(200, ""));
        assert!(!result.is_success());
        assert_eq!(result.raw(), Some(""));
    }

    #[test]
    fn transport_error_has_no_status_or_body() {
        let result = normalize(Err(TransportError::Send("connection refused".to_string())));
        assert!(!result.is_success());
        assert!(result.status_code().is_none());
        assert!(result.raw().is_none());
        assert!(result.data().is_none());
        assert_eq!(
            result.error_message(),
            Some("Problem with response: connection refused")
        );
    }

    #[test]
    fn currencies_are_flattened_to_a_map() {
        let body = r#"{"currencies":[{"code":"ADF","description":"Andorran Franc"}]}"#;
        let result = normalize_currencies(ok(200, body));
        assert!(result.is_success());
        assert_eq!(result.data(), Some(&json!({"ADF": "Andorran Franc"})));
        assert_eq!(result.raw(), Some(body));
    }

    #[test]
    fn duplicate_currency_codes_keep_last_description() {
        let body = r#"{"currencies":[{"code":"EUR","description":"Euro"},{"code":"EUR","description":"European Euro"}]}"#;
        let result = normalize_currencies(ok(200, body));
        assert_eq!(result.data(), Some(&json!({"EUR": "European Euro"})));
    }

    #[test]
    fn unexpected_currency_shape_is_a_failure() {
        let result = normalize_currencies(ok(200, r#"{"currencies":"none"}"#));
        assert!(!result.is_success());
        assert_eq!(result.status_code(), Some(200));
        assert!(result.error_code().is_none());
        assert!(result
            .error_message()
            .unwrap()
            .starts_with("Unable to parse currency list:"));
    }

    #[test]
    fn currency_errors_pass_through() {
        let result = normalize_currencies(ok(400, BAD_TOKEN));
        assert_eq!(result, normalize(ok(400, BAD_TOKEN)));
    }
}
