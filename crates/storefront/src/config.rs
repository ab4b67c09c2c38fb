//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_API_URL` - Base URL of the shop REST API (e.g., `http://127.0.0.1:5000`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_PAGE_SIZE` - Products per listing page (default: 8)
//! - `STOREFRONT_NOTICE_SECONDS` - How long the add-to-cart notice stays visible (default: 3)
//! - `BAZAAR_API_TOKEN` - Bearer token sent to the shop API (high entropy, if set)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_PAGE_SIZE: u32 = 8;
const DEFAULT_NOTICE_SECONDS: u64 = 3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Shop REST API configuration
    pub api: ApiConfig,
    /// Products per listing page
    pub page_size: u32,
    /// Lifetime of transient notices (e.g., "added to cart")
    pub notice_ttl: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Shop REST API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct ApiConfig {
    /// Base URL, always ending in `/` so relative paths join beneath it
    pub base_url: Url,
    /// Optional bearer token for the API
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid, or
    /// if the API token fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let page_size = parse_page_size(&get_env_or_default(
            "STOREFRONT_PAGE_SIZE",
            &DEFAULT_PAGE_SIZE.to_string(),
        ))?;
        let notice_seconds: u64 =
            parse_env("STOREFRONT_NOTICE_SECONDS", &DEFAULT_NOTICE_SECONDS.to_string())?;

        Ok(Self {
            host,
            port,
            base_url,
            api: ApiConfig::from_env()?,
            page_size,
            notice_ttl: Duration::from_secs(notice_seconds),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (enables secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = parse_api_base_url(&get_required_env("BAZAAR_API_URL")?)
            .map_err(|e| ConfigError::InvalidEnvVar("BAZAAR_API_URL".to_string(), e))?;
        let token = get_optional_env("BAZAAR_API_TOKEN")
            .map(|token| {
                validate_secret_strength(&token, "BAZAAR_API_TOKEN")?;
                Ok(SecretString::from(token))
            })
            .transpose()?;

        Ok(Self { base_url, token })
    }

    /// Build an API configuration from a base URL string.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the URL is not an absolute
    /// http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, String> {
        Ok(Self {
            base_url: parse_api_base_url(base_url)?,
            token: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse the API base URL, normalising it to end with a `/`.
fn parse_api_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_page_size(raw: &str) -> Result<u32, ConfigError> {
    match raw.parse::<u32>() {
        Ok(size) if size >= 1 => Ok(size),
        Ok(_) => Err(ConfigError::InvalidEnvVar(
            "STOREFRONT_PAGE_SIZE".to_string(),
            "must be at least 1".to_string(),
        )),
        Err(e) => Err(ConfigError::InvalidEnvVar(
            "STOREFRONT_PAGE_SIZE".to_string(),
            e.to_string(),
        )),
    }
}

/// Parse an environment variable with a default value.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Shannon entropy of `s` in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
    }

    let total: u32 = counts.values().sum();
    if total == 0 {
        return 0.0;
    }
    let total = f64::from(total);

    counts
        .values()
        .map(|&n| {
            let p = f64::from(n) / total;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated token."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_token_placeholder_rejected() {
        let err = validate_secret_strength("your-api-token-here", "BAZAAR_API_TOKEN").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_token_low_entropy_rejected() {
        assert!(validate_secret_strength("abababababababab", "BAZAAR_API_TOKEN").is_err());
    }

    #[test]
    fn test_token_high_entropy_accepted() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "BAZAAR_API_TOKEN").is_ok());
    }

    #[test]
    fn test_api_base_url_gets_trailing_slash() {
        let url = parse_api_base_url("http://127.0.0.1:5000/api").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5000/api/");
        assert_eq!(url.join("cart").unwrap().as_str(), "http://127.0.0.1:5000/api/cart");

        let root = parse_api_base_url("http://127.0.0.1:5000").unwrap();
        assert_eq!(root.join("products/3").unwrap().as_str(), "http://127.0.0.1:5000/products/3");
    }

    #[test]
    fn test_api_base_url_rejects_other_schemes() {
        assert!(parse_api_base_url("ftp://example.org").is_err());
        assert!(parse_api_base_url("not a url").is_err());
    }

    #[test]
    fn test_page_size_must_be_positive() {
        assert_eq!(parse_page_size("8").unwrap(), 8);
        assert!(parse_page_size("0").is_err());
        assert!(parse_page_size("-1").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            api: ApiConfig::new("http://127.0.0.1:5000").unwrap(),
            page_size: 8,
            notice_ttl: Duration::from_secs(3),
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());
    }

    #[test]
    fn test_api_config_debug_redacts_token() {
        let config = ApiConfig {
            base_url: Url::parse("http://127.0.0.1:5000/").unwrap(),
            token: Some(SecretString::from("super_secret_api_token")),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("127.0.0.1:5000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_token"));
        assert_eq!(
            config.token.as_ref().unwrap().expose_secret(),
            "super_secret_api_token"
        );
    }
}
