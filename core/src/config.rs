//! Client configuration and proxy resolution.
//!
//! # Design
//! The environment fallback for the proxy is read exactly once, when the
//! client is built, through an injected `Environment`. After that the proxy
//! is a plain field and the HTTP stack is told to ignore the process
//! environment.

use log::debug;

/// Production endpoint of the rates API.
pub const DEFAULT_BASE_URL: &str = "https://www.oanda.com/rates/api/v1";

/// Environment variables consulted, in order, when no proxy is configured.
pub const PROXY_ENV_VARS: [&str; 4] = ["http_proxy", "HTTP_PROXY", "https_proxy", "HTTPS_PROXY"];

/// Source of environment variables.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<F> Environment for F
where
    F: Fn(&str) -> Option<String>,
{
    fn var(&self, key: &str) -> Option<String> {
        self(key)
    }
}

/// Settings for `ExchangeRatesClient`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    /// Explicit proxy URL. Takes precedence over the environment.
    pub proxy: Option<String>,
    pub base_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            proxy: None,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The API key, if one is set and not blank.
    pub(crate) fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    /// The proxy to use: the explicit setting, else the first non-empty
    /// `PROXY_ENV_VARS` entry.
    pub fn resolve_proxy(&self, env: &dyn Environment) -> Option<String> {
        if let Some(proxy) = non_blank(self.proxy.as_deref()) {
            return Some(proxy.to_string());
        }
        PROXY_ENV_VARS.iter().find_map(|key| {
            let value = env.var(key)?;
            let value = non_blank(Some(value.as_str()))?.to_string();
            debug!("using proxy from ${key}");
            Some(value)
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_targets_production_api() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        assert_eq!(ClientConfig::new("   ").api_key(), None);
        assert_eq!(ClientConfig::new("42").api_key(), Some("42"));
    }

    #[test]
    fn explicit_proxy_wins_over_environment() {
        let env = |key: &str| (key == "http_proxy").then(|| "http://env:3128".to_string());
        let config = ClientConfig::new("42").with_proxy("http://proxy:8080");
        assert_eq!(config.resolve_proxy(&env).as_deref(), Some("http://proxy:8080"));
    }

    #[test]
    fn environment_proxy_is_used_as_fallback() {
        let env = |key: &str| (key == "http_proxy").then(|| "http://proxy:8080".to_string());
        let config = ClientConfig::new("42");
        assert_eq!(config.resolve_proxy(&env).as_deref(), Some("http://proxy:8080"));
    }

    #[test]
    fn environment_variables_are_checked_in_order() {
        let env = |key: &str| match key {
            "HTTP_PROXY" => Some(String::new()),
            "https_proxy" => Some("http://secure:8443".to_string()),
            "HTTPS_PROXY" => Some("http://ignored:1".to_string()),
            _ => None,
        };
        let config = ClientConfig::new("42");
        assert_eq!(config.resolve_proxy(&env).as_deref(), Some("http://secure:8443"));
    }

    #[test]
    fn no_proxy_when_nothing_is_set() {
        assert_eq!(ClientConfig::new("42").resolve_proxy(&no_env), None);
    }
}
