//! Portal configuration.
//!
//! Defaults match the production portal; every value can be overridden from
//! the environment or with the `with_*` builder methods.

use std::path::PathBuf;
use std::time::Duration;

use crate::api::{DEFAULT_API_URL, DEFAULT_QUERY_TTL};
use crate::credential::DEFAULT_ROTATION_INTERVAL;
use crate::crypto::{CredentialCodec, DEFAULT_PASS_IV, DEFAULT_PASS_SECRET};
use crate::error::SystemError;

pub const ENV_API_URL: &str = "MEMBERPASS_API_URL";
pub const ENV_QR_SECRET: &str = "MEMBERPASS_QR_SECRET";
pub const ENV_QR_IV: &str = "MEMBERPASS_QR_IV";
pub const ENV_ROTATION_SECS: &str = "MEMBERPASS_ROTATION_SECS";
pub const ENV_QUERY_TTL_SECS: &str = "MEMBERPASS_QUERY_TTL_SECS";
pub const ENV_HOME: &str = "MEMBERPASS_HOME";

/// Transport timeout for every backend call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound for second-valued overrides (one day).
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// # Example
///
/// ```ignore
/// use memberpass::startup::PortalConfig;
///
/// let config = PortalConfig::default()
///     .with_api_url("https://portal.example.org")
///     .with_rotation_interval(Duration::from_secs(60));
/// ```
#[derive(Clone)]
pub struct PortalConfig {
    pub api_url: String,
    pub pass_secret: String,
    pub pass_iv: String,
    pub rotation_interval: Duration,
    pub query_ttl: Duration,
    pub request_timeout: Duration,
    /// Directory holding `storage.json`; `None` means `~/.memberpass`.
    pub storage_dir: Option<PathBuf>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            pass_secret: DEFAULT_PASS_SECRET.to_string(),
            pass_iv: DEFAULT_PASS_IV.to_string(),
            rotation_interval: DEFAULT_ROTATION_INTERVAL,
            query_ttl: DEFAULT_QUERY_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            storage_dir: None,
        }
    }
}

impl PortalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_pass_key(mut self, secret: impl Into<String>, iv: impl Into<String>) -> Self {
        self.pass_secret = secret.into();
        self.pass_iv = iv.into();
        self
    }

    /// Clamped to [`MAX_INTERVAL_SECS`].
    pub fn with_rotation_interval(mut self, interval: Duration) -> Self {
        self.rotation_interval = interval.min(max_interval());
        self
    }

    /// Clamped to [`MAX_INTERVAL_SECS`].
    pub fn with_query_ttl(mut self, ttl: Duration) -> Self {
        self.query_ttl = ttl.min(max_interval());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    /// Codec built from the configured key material.
    pub fn codec(&self) -> CredentialCodec {
        CredentialCodec::new(&self.pass_secret, &self.pass_iv)
    }

    /// Read `MEMBERPASS_*` variables over the defaults.
    pub fn from_env() -> Result<Self, SystemError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SystemError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get(ENV_API_URL) {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secret) = get(ENV_QR_SECRET) {
            config.pass_secret = secret;
        }
        if let Some(iv) = get(ENV_QR_IV) {
            config.pass_iv = iv;
        }
        if let Some(secs) = get(ENV_ROTATION_SECS) {
            config.rotation_interval = parse_secs(ENV_ROTATION_SECS, &secs)?;
        }
        if let Some(secs) = get(ENV_QUERY_TTL_SECS) {
            config.query_ttl = parse_secs(ENV_QUERY_TTL_SECS, &secs)?;
        }
        if let Some(dir) = get(ENV_HOME) {
            config.storage_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }
}

pub(crate) fn max_interval() -> Duration {
    Duration::from_secs(MAX_INTERVAL_SECS)
}

fn parse_secs(variable: &str, value: &str) -> Result<Duration, SystemError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(SystemError::EnvironmentError {
            variable: variable.to_string(),
            message: "must be greater than zero".to_string(),
        }),
        Ok(secs) if secs > MAX_INTERVAL_SECS => Err(SystemError::EnvironmentError {
            variable: variable.to_string(),
            message: format!("must be at most {} seconds, got {}", MAX_INTERVAL_SECS, secs),
        }),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(SystemError::EnvironmentError {
            variable: variable.to_string(),
            message: format!("expected whole seconds, got '{}': {}", value, e),
        }),
    }
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("api_url", &self.api_url)
            .field("pass_secret", &"<redacted>")
            .field("pass_iv", &"<redacted>")
            .field("rotation_interval", &self.rotation_interval)
            .field("query_ttl", &self.query_ttl)
            .field("request_timeout", &self.request_timeout)
            .field("storage_dir", &self.storage_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PortalConfig::default();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.rotation_interval, Duration::from_secs(300));
        assert_eq!(config.query_ttl, Duration::from_secs(60));
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = PortalConfig::new()
            .with_api_url("https://portal.example.org")
            .with_rotation_interval(Duration::from_secs(60))
            .with_storage_dir("/tmp/memberpass");
        assert_eq!(config.api_url, "https://portal.example.org");
        assert_eq!(config.rotation_interval, Duration::from_secs(60));
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/memberpass")));
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = PortalConfig::from_lookup(lookup(&[
            (ENV_API_URL, "https://portal.example.org/"),
            (ENV_ROTATION_SECS, "120"),
            (ENV_QUERY_TTL_SECS, "5"),
            (ENV_HOME, "/var/lib/memberpass"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://portal.example.org");
        assert_eq!(config.rotation_interval, Duration::from_secs(120));
        assert_eq!(config.query_ttl, Duration::from_secs(5));
        assert_eq!(
            config.storage_dir,
            Some(PathBuf::from("/var/lib/memberpass"))
        );
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let config = PortalConfig::from_lookup(lookup(&[(ENV_API_URL, "  ")])).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_invalid_seconds() {
        let err = PortalConfig::from_lookup(lookup(&[(ENV_ROTATION_SECS, "five")])).unwrap_err();
        assert!(matches!(
            err,
            SystemError::EnvironmentError { ref variable, .. } if variable == ENV_ROTATION_SECS
        ));

        assert!(PortalConfig::from_lookup(lookup(&[(ENV_QUERY_TTL_SECS, "0")])).is_err());
    }

    #[test]
    fn test_oversized_seconds_are_rejected() {
        let err = PortalConfig::from_lookup(lookup(&[(ENV_ROTATION_SECS, "18446744073709551615")]))
            .unwrap_err();
        assert!(matches!(
            err,
            SystemError::EnvironmentError { ref variable, .. } if variable == ENV_ROTATION_SECS
        ));
        assert!(PortalConfig::from_lookup(lookup(&[(ENV_QUERY_TTL_SECS, "86401")])).is_err());

        let config = PortalConfig::from_lookup(lookup(&[(ENV_QUERY_TTL_SECS, "86400")])).unwrap();
        assert_eq!(config.query_ttl, Duration::from_secs(MAX_INTERVAL_SECS));
    }

    #[test]
    fn test_builders_clamp_oversized_durations() {
        let config = PortalConfig::default()
            .with_rotation_interval(Duration::MAX)
            .with_query_ttl(Duration::from_secs(u64::MAX));
        assert_eq!(config.rotation_interval, max_interval());
        assert_eq!(config.query_ttl, max_interval());
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let debug = format!("{:?}", PortalConfig::default());
        assert!(!debug.contains(DEFAULT_PASS_SECRET));
        assert!(debug.contains("<redacted>"));
    }
}
