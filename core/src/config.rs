//! Client configuration: base URL, bearer credential and default timeout.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// Timeout applied when a call does not supply its own.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_BASE_URL: &str = "JOBS_API_BASE_URL";
pub const ENV_API_KEY: &str = "JOBS_API_KEY";
pub const ENV_TIMEOUT_MS: &str = "JOBS_API_TIMEOUT_MS";

/// Validated, immutable client configuration.
///
/// `base_url` never ends with `/`; `base_url` and `credential` are never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    credential: String,
    default_timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str, credential: &str) -> Result<Self> {
        let base_url = normalize_base_url(base_url);
        if base_url.is_empty() {
            return Err(Error::Configuration("base_url is required".to_string()));
        }
        if credential.is_empty() {
            return Err(Error::Configuration("api_key is required".to_string()));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            credential: credential.to_string(),
            default_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        })
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Load from `JOBS_API_BASE_URL`, `JOBS_API_KEY` and the optional
    /// `JOBS_API_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(ENV_BASE_URL).unwrap_or_default();
        let credential = lookup(ENV_API_KEY).unwrap_or_default();
        let config = Self::new(&base_url, &credential)?;

        match lookup(ENV_TIMEOUT_MS) {
            Some(raw) if !raw.trim().is_empty() => {
                let ms: u64 = raw.trim().parse().map_err(|_| {
                    Error::Configuration(format!("{ENV_TIMEOUT_MS} must be an integer, got {raw:?}"))
                })?;
                Ok(config.with_default_timeout(Duration::from_millis(ms)))
            }
            _ => Ok(config),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("credential", &"<redacted>")
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

/// Strip every trailing `/`. Idempotent.
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let config = ClientConfig::new("http://localhost:3000///", "token").unwrap();
        assert_eq!(config.base_url(), "http://localhost:3000");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["http://a/", "http://a//", "http://a", "http://a/v1/"] {
            let once = normalize_base_url(input);
            assert_eq!(normalize_base_url(once), once);
            assert!(!once.ends_with('/'));
        }
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let err = ClientConfig::new("", "token").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn separator_only_base_url_is_rejected() {
        let err = ClientConfig::new("///", "token").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn empty_credential_is_rejected() {
        let err = ClientConfig::new("http://localhost", "").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn default_timeout_is_thirty_seconds() {
        let config = ClientConfig::new("http://localhost", "token").unwrap();
        assert_eq!(config.default_timeout(), Duration::from_secs(30));
        let config = config.with_default_timeout(Duration::from_millis(250));
        assert_eq!(config.default_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn debug_redacts_credential() {
        let config = ClientConfig::new("http://localhost", "super-secret").unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn from_lookup_reads_all_variables() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "https://jobs.example.com/api/"),
            (ENV_API_KEY, "key"),
            (ENV_TIMEOUT_MS, "1500"),
        ]))
        .unwrap();
        assert_eq!(config.base_url(), "https://jobs.example.com/api");
        assert_eq!(config.credential(), "key");
        assert_eq!(config.default_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn from_lookup_defaults_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "https://jobs.example.com"),
            (ENV_API_KEY, "key"),
        ]))
        .unwrap();
        assert_eq!(config.default_timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn from_lookup_requires_credential() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_BASE_URL, "https://jobs.example.com")])).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn from_lookup_rejects_bad_timeout() {
        let err = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "https://jobs.example.com"),
            (ENV_API_KEY, "key"),
            (ENV_TIMEOUT_MS, "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_MS));
    }
}
