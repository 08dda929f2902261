//! Cart configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required for inventory lookups
//! - `CART_API_URL` - Base URL of the inventory API (e.g., `http://localhost:3333`)
//!
//! ## Optional
//! - `CART_API_TOKEN` - Bearer token sent to the inventory API
//! - `CART_API_TIMEOUT_SECS` - Request timeout in seconds (default: 10)
//! - `CART_PRODUCT_CACHE_TTL_SECS` - Product metadata cache TTL (default: 300, 0 disables)
//! - `CART_STORAGE_DIR` - Directory for the file-backed cart store (default: `.cart`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: &str = "10";
const DEFAULT_PRODUCT_CACHE_TTL_SECS: &str = "300";
const DEFAULT_STORAGE_DIR: &str = ".cart";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Cart application configuration.
#[derive(Debug, Clone)]
pub struct CartConfig {
    /// Inventory API configuration; `None` when `CART_API_URL` is unset
    pub inventory: Option<InventoryApiConfig>,
    /// Directory holding the durable cart snapshot
    pub storage_dir: PathBuf,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Inventory API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct InventoryApiConfig {
    /// Base URL; always ends with `/` so relative paths join beneath it
    pub base_url: Url,
    /// Optional bearer token
    pub token: Option<SecretString>,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long product metadata stays cached (zero disables the cache)
    pub product_cache_ttl: Duration,
}

impl std::fmt::Debug for InventoryApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .field("product_cache_ttl", &self.product_cache_ttl)
            .finish()
    }
}

impl CartConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let inventory = InventoryApiConfig::from_env()?;
        let storage_dir = PathBuf::from(get_env_or_default("CART_STORAGE_DIR", DEFAULT_STORAGE_DIR));

        Ok(Self {
            inventory,
            storage_dir,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// The inventory configuration, for operations that validate stock.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `CART_API_URL` was not set.
    pub fn require_inventory(&self) -> Result<&InventoryApiConfig, ConfigError> {
        self.inventory
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("CART_API_URL".to_string()))
    }
}

impl InventoryApiConfig {
    /// Build a configuration with default timeout and cache settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("CART_API_URL", base_url)?,
            token: None,
            timeout: Duration::from_secs(10),
            product_cache_ttl: Duration::from_secs(300),
        })
    }

    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(base_url) = get_optional_env("CART_API_URL") else {
            return Ok(None);
        };
        let base_url = parse_base_url("CART_API_URL", &base_url)?;
        let timeout = parse_secs(
            "CART_API_TIMEOUT_SECS",
            &get_env_or_default("CART_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        )?;
        let product_cache_ttl = parse_secs(
            "CART_PRODUCT_CACHE_TTL_SECS",
            &get_env_or_default("CART_PRODUCT_CACHE_TTL_SECS", DEFAULT_PRODUCT_CACHE_TTL_SECS),
        )?;

        Ok(Some(Self {
            base_url,
            token: get_optional_env("CART_API_TOKEN").map(SecretString::from),
            timeout,
            product_cache_ttl,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an absolute base URL and make sure it ends with a slash.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Parse a whole number of seconds.
fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_adds_trailing_slash() {
        let url = parse_base_url("TEST", "http://localhost:3333/api").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3333/api/");
        assert_eq!(
            url.join("stock/1").unwrap().as_str(),
            "http://localhost:3333/api/stock/1"
        );
    }

    #[test]
    fn test_parse_base_url_root() {
        let url = parse_base_url("TEST", "http://localhost:3333").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3333/");
    }

    #[test]
    fn test_parse_base_url_rejects_relative() {
        let err = parse_base_url("TEST", "/api").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));

        let err = parse_base_url("TEST", "mailto:shop@example.com").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("TEST", " 15 ").unwrap(), Duration::from_secs(15));
        assert_eq!(parse_secs("TEST", "0").unwrap(), Duration::ZERO);
        assert!(parse_secs("TEST", "-1").is_err());
        assert!(parse_secs("TEST", "soon").is_err());
    }

    #[test]
    fn test_require_inventory() {
        let mut config = CartConfig {
            inventory: None,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            sentry_dsn: None,
            sentry_environment: None,
        };
        let err = config.require_inventory().unwrap_err();
        assert_eq!(err.to_string(), "Missing environment variable: CART_API_URL");

        config.inventory = Some(InventoryApiConfig::new("http://localhost:3333").unwrap());
        assert_eq!(
            config.require_inventory().unwrap().base_url.as_str(),
            "http://localhost:3333/"
        );
    }

    #[test]
    fn test_inventory_config_debug_redacts_token() {
        let mut config = InventoryApiConfig::new("http://localhost:3333").unwrap();
        config.token = Some(SecretString::from("super_secret_api_token"));

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("localhost:3333"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_api_token"));
    }
}
