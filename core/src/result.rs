//! The uniform outcome envelope handed back for every request.
//!
//! # Design
//! Fields are private and the only constructors are the four outcomes the
//! normalizer can reach: success, API error, unparseable body and transport
//! failure. That keeps `success == true` paired with `data` and no error
//! fields, and `success == false` paired with an error message, without any
//! runtime checks. Serialization uses the camelCase keys of the wire-facing
//! shape and omits absent fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized outcome of one API request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_code: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl ApiResult {
    pub(crate) fn success(status_code: u16, raw: String, data: Value) -> Self {
        Self {
            status_code: Some(status_code),
            raw: Some(raw),
            data: Some(data),
            success: true,
            error_code: None,
            error_message: None,
        }
    }

    pub(crate) fn api_error(
        status_code: u16,
        raw: String,
        error_code: Option<Value>,
        error_message: String,
    ) -> Self {
        Self {
            status_code: Some(status_code),
            raw: Some(raw),
            data: None,
            success: false,
            error_code,
            error_message: Some(error_message),
        }
    }

    pub(crate) fn invalid_body(status_code: u16, raw: String, error_message: String) -> Self {
        Self::api_error(status_code, raw, None, error_message)
    }

    pub(crate) fn transport_failure(error_message: String) -> Self {
        Self {
            status_code: None,
            raw: None,
            data: None,
            success: false,
            error_code: None,
            error_message: Some(error_message),
        }
    }

    /// Reshape the payload of a successful result, keeping status and raw
    /// body. A rejected payload turns the result into a failure.
    pub(crate) fn try_map_data(mut self, f: impl FnOnce(Value) -> Result<Value, String>) -> Self {
        if !self.success {
            return self;
        }
        let Some(data) = self.data.take() else {
            return self;
        };
        match f(data) {
            Ok(data) => self.data = Some(data),
            Err(message) => {
                self.success = false;
                self.error_message = Some(message);
            }
        }
        self
    }

    /// The HTTP status, absent when the transport failed.
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// The body exactly as received.
    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<Value> {
        self.data
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// The `code` field of an API error body.
    pub fn error_code(&self) -> Option<&Value> {
        self.error_code.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Deserialize `data` into a typed view such as `RatesResponse`.
    ///
    /// Returns `None` for failed results.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<Result<T, serde_json::Error>> {
        self.data.as_ref().map(|data| T::deserialize(data))
    }
}
