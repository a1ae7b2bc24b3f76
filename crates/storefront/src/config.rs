//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SHIPPING_FEE` - Flat shipping fee in GBP (default: 4.99)
//! - `FREE_SHIPPING_THRESHOLD` - Subtotal for free shipping in GBP (default: 50.00)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use mistore_core::pricing::PricingPolicy;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

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
#[derive(Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: Url,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Shipping fee and free-shipping threshold
    pub pricing: PricingPolicy,
    /// Emit JSON logs
    pub json_logs: bool,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Sentry settings shared by both binaries' `init_sentry`.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.1,
        }
    }
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url.as_str())
            .field("session_secret", &"[REDACTED]")
            .field("pricing", &self.pricing)
            .field("json_logs", &self.json_logs)
            .field("sentry", &self.sentry)
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
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = get_base_url("STOREFRONT_BASE_URL")?;
        let session_secret = load_session_secret("STOREFRONT_SESSION_SECRET")?;

        let defaults = PricingPolicy::default();
        let pricing = PricingPolicy {
            shipping_fee: parse_money_or("SHIPPING_FEE", defaults.shipping_fee)?,
            free_shipping_threshold: parse_money_or(
                "FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold,
            )?,
        };

        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            pricing,
            json_logs,
            sentry: SentryConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", &defaults.sample_rate.to_string())?,
            traces_sample_rate: parse_env_or_default(
                "SENTRY_TRACES_SAMPLE_RATE",
                &defaults.traces_sample_rate.to_string(),
            )?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_optional_env(key).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a non-negative GBP amount.
fn parse_money_or(key: &str, default: Decimal) -> Result<Decimal, ConfigError> {
    let amount: Decimal = parse_env_or_default(key, &default.to_string())?;
    if amount.is_sign_negative() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must not be negative".to_string(),
        ));
    }
    Ok(amount)
}

/// Parse and check the public base URL.
fn get_base_url(key: &str) -> Result<Url, ConfigError> {
    parse_base_url(key, &get_required_env(key)?)
}

fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

/// Load the session secret, refusing short, placeholder or guessable values.
fn load_session_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    check_session_secret(key, &value)?;
    Ok(SecretString::from(value))
}

fn check_session_secret(key: &str, value: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| Err(ConfigError::InsecureSecret(key.to_string(), reason));

    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return insecure(format!(
            "must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {})",
            value.len()
        ));
    }

    let lower = value.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return insecure(format!("looks like a placeholder (contains '{pattern}')"));
    }

    let bits = entropy_bits_per_char(value);
    if bits < MIN_ENTROPY_BITS_PER_CHAR {
        return insecure(format!(
            "too predictable ({bits:.2} bits/char, need {MIN_ENTROPY_BITS_PER_CHAR:.1}); generate one with `openssl rand -base64 48`"
        ));
    }
    Ok(())
}

/// Shannon entropy over bytes.
#[allow(clippy::cast_precision_loss, clippy::indexing_slicing)]
fn entropy_bits_per_char(value: &str) -> f64 {
    let mut counts = [0_usize; 256];
    for byte in value.bytes() {
        counts[usize::from(byte)] += 1;
    }
    let len = value.len() as f64;
    counts
        .iter()
        .filter(|&&n| n > 0)
        .map(|&n| {
            let p = n as f64 / len;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entropy() {
        assert!(entropy_bits_per_char(&"a".repeat(40)).abs() < f64::EPSILON);
        assert!((entropy_bits_per_char("abab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_session_secret_checks() {
        let err = check_session_secret("K", "short").unwrap_err();
        assert!(err.to_string().contains("at least 32"));
        let err = check_session_secret("K", "changeme-changeme-changeme-changeme").unwrap_err();
        assert!(err.to_string().contains("placeholder"));
        assert!(check_session_secret("K", &"ab".repeat(20)).is_err());
        assert!(check_session_secret("K", "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%").is_ok());
    }

    #[test]
    fn test_parse_base_url() {
        let url = parse_base_url("BASE", "https://shop.mistore.co.uk").unwrap();
        assert_eq!(url.host_str(), Some("shop.mistore.co.uk"));
        assert!(parse_base_url("BASE", "ftp://shop.mistore.co.uk").is_err());
        assert!(parse_base_url("BASE", "not a url").is_err());
    }

    #[test]
    fn test_socket_addr_and_https() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: Url::parse("http://localhost:3000").unwrap(),
            session_secret: SecretString::from("x".repeat(32)),
            pricing: PricingPolicy::default(),
            json_logs: false,
            sentry: SentryConfig::default(),
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_https());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://user:hunter2@db/mistore"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: Url::parse("https://shop.mistore.co.uk").unwrap(),
            session_secret: SecretString::from("super_secret_session_value_123456"),
            pricing: PricingPolicy::default(),
            json_logs: true,
            sentry: SentryConfig::default(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("shop.mistore.co.uk"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("super_secret_session_value"));
    }
}
