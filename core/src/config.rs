//! Client configuration.
//!
//! Values come from JSON (hosts embedding the FFI library hand one over) or
//! from `UNISEARCH_*` environment variables. Missing fields fall back to the
//! public universities endpoint with a 30 second timeout.

use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

pub const DEFAULT_BASE_URL: &str = "http://universities.hipolabs.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_BASE_URL: &str = "UNISEARCH_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "UNISEARCH_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "UNISEARCH_USER_AGENT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.checked()
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, using the same keys as
    /// `from_env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = base_url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{ENV_TIMEOUT_SECS} must be a number, got `{raw}`")))?;
        }
        config.user_agent = lookup(ENV_USER_AGENT).filter(|agent| !agent.is_empty());
        config.checked()
    }

    /// A zero timeout would fail every request before it is sent.
    fn checked(self) -> Result<Self, Error> {
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_public_endpoint() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://universities.hipolabs.com");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config = ClientConfig::from_json(r#"{"base_url":"http://localhost:3000"}"#).unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn json_rejects_wrong_types() {
        let err = ClientConfig::from_json(r#"{"timeout_secs":"soon"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://127.0.0.1:9000"),
            (ENV_TIMEOUT_SECS, " 5 "),
            (ENV_USER_AGENT, "unisearch-tests"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.user_agent.as_deref(), Some("unisearch-tests"));
    }

    #[test]
    fn lookup_rejects_bad_timeout() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "ten")])).unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ClientConfig::from_json(r#"{"timeout_secs":0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "0")])).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn empty_lookup_yields_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }
}
