//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_API_URL` - Base URL of the REST API (e.g., `https://api.example.com/api/v1`)
//!
//! ## Optional
//! - `BAZAAR_API_TOKEN` - Bearer token to start with (normally set by `login`)
//! - `BAZAAR_STATE_PATH` - Persisted client state file (default: `.bazaar/state.json`)
//! - `BAZAAR_CACHE_CAPACITY` - Maximum cached query results (default: 500)
//! - `BAZAAR_CACHE_TTL_SECS` - Cached query lifetime in seconds (default: 300)
//! - `BAZAAR_TIMEOUT_SECS` - Per-request timeout in seconds (default: none)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_STATE_PATH: &str = ".bazaar/state.json";
const DEFAULT_CACHE_CAPACITY: u64 = 500;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// API client configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL every request path is appended to.
    pub api_url: Url,
    /// Initial bearer token.
    pub api_token: Option<SecretString>,
    /// Where the persisted slice of client state lives.
    pub state_path: PathBuf,
    /// Maximum number of cached query results.
    pub cache_capacity: u64,
    /// How long a cached query result stays fresh.
    pub cache_ttl: Duration,
    /// Per-request timeout; `None` leaves requests unbounded.
    pub timeout: Option<Duration>,
    /// Sentry DSN for error tracking.
    pub sentry_dsn: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("state_path", &self.state_path)
            .field("cache_capacity", &self.cache_capacity)
            .field("cache_ttl", &self.cache_ttl)
            .field("timeout", &self.timeout)
            .field("sentry_dsn", &self.sentry_dsn)
            .finish()
    }
}

impl ClientConfig {
    /// Configuration for `api_url` with every optional setting at its default.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            api_token: None,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            timeout: None,
            sentry_dsn: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `BAZAAR_API_URL` is missing or any variable
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_url = parse_api_url(&get_required_env("BAZAAR_API_URL")?)?;
        let api_token = get_optional_env("BAZAAR_API_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from);
        let state_path = PathBuf::from(get_env_or_default("BAZAAR_STATE_PATH", DEFAULT_STATE_PATH));
        let cache_capacity = parse_env_or("BAZAAR_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?;
        let cache_ttl = Duration::from_secs(parse_env_or(
            "BAZAAR_CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?);
        let timeout = get_optional_env("BAZAAR_TIMEOUT_SECS")
            .map(|v| parse_value::<u64>("BAZAAR_TIMEOUT_SECS", &v))
            .transpose()?
            .map(Duration::from_secs);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api_url,
            api_token,
            state_path,
            cache_capacity,
            cache_ttl,
            timeout,
            sentry_dsn,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the API base URL, requiring an http(s) scheme.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidEnvVar("BAZAAR_API_URL".to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            "BAZAAR_API_URL".to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |v| parse_value(key, &v))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_parse_api_url_accepts_https() {
        let url = parse_api_url("https://api.example.com/api/v1").unwrap();
        assert_eq!(url.path(), "/api/v1");
    }

    #[test]
    fn test_parse_api_url_rejects_other_schemes() {
        let err = parse_api_url("ftp://api.example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
        assert!(parse_api_url("not a url").is_err());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u64>("X", " 42 ").unwrap(), 42);
        let err = parse_value::<u64>("X", "forty").unwrap_err();
        assert!(err.to_string().starts_with("Invalid environment variable X"));
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(Url::parse("http://localhost:5000/api/v1").unwrap());
        assert_eq!(config.cache_capacity, 500);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert!(config.timeout.is_none());
        assert_eq!(config.state_path, PathBuf::from(".bazaar/state.json"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = ClientConfig::new(Url::parse("http://localhost:5000").unwrap());
        config.api_token = Some(SecretString::from("super_secret_bearer"));

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_bearer"));
        assert_eq!(
            config.api_token.unwrap().expose_secret(),
            "super_secret_bearer"
        );
    }
}
