//! Showtimes API configuration.
//!
//! Configuration is loaded from environment variables. The upstream movie
//! database key is redacted in Debug output.
//!
//! The identity provider domain and expected audience are optional at load
//! time so the process can start and serve health checks; requests to
//! protected routes fail with a 500 until they are configured.

use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8787";

/// Default scheme for the JWKS discovery endpoint.
pub const DEFAULT_JWKS_SCHEME: &str = "https";

/// Default application name used by the preview-origin rule.
pub const DEFAULT_APP_NAME: &str = "showtimes";

/// Default parent domain of preview deployments.
pub const DEFAULT_PREVIEW_DOMAIN: &str = "workers.dev";

/// Default header carrying the client address set by the edge proxy.
pub const DEFAULT_CLIENT_IP_HEADER: &str = "cf-connecting-ip";

/// Default admitted authentication attempts per window per client.
pub const DEFAULT_RATE_LIMIT_PER_WINDOW: u32 = 100;

/// Default rate limit window length in seconds.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

/// Longest accepted rate limit window in seconds (one day).
pub const MAX_RATE_LIMIT_WINDOW_SECONDS: u64 = 86_400;

/// Default upstream movie database base URL.
pub const DEFAULT_MOVIE_API_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Showtimes API configuration.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8787").
    pub bind_address: String,

    /// Identity provider domain. Tokens must carry `iss = https://{domain}/`.
    pub issuer_domain: Option<String>,

    /// Expected `aud` claim. Also the primary allowed CORS origin.
    pub audience: Option<String>,

    /// Scheme used to reach the JWKS endpoint ("https", or "http" for local mocks).
    pub jwks_scheme: String,

    /// Optional custom domain the app is served from.
    pub custom_domain: Option<String>,

    /// Application name for preview subdomains (`<label>-{app_name}.<account>.{preview_domain}`).
    pub app_name: String,

    /// Parent domain of preview deployments.
    pub preview_domain: String,

    /// When true, raw error diagnostics are returned to clients.
    pub development_mode: bool,

    /// Header that carries the trusted client address.
    pub client_ip_header: String,

    /// Admitted calls per rate limit window per client.
    pub rate_limit_per_window: u32,

    /// Rate limit window length in seconds.
    pub rate_limit_window_seconds: u64,

    /// Upstream movie database base URL.
    pub movie_api_base_url: String,

    /// Upstream movie database API key.
    pub movie_api_key: Option<SecretString>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("issuer_domain", &self.issuer_domain)
            .field("audience", &self.audience)
            .field("jwks_scheme", &self.jwks_scheme)
            .field("custom_domain", &self.custom_domain)
            .field("app_name", &self.app_name)
            .field("preview_domain", &self.preview_domain)
            .field("development_mode", &self.development_mode)
            .field("client_ip_header", &self.client_ip_header)
            .field("rate_limit_per_window", &self.rate_limit_per_window)
            .field("rate_limit_window_seconds", &self.rate_limit_window_seconds)
            .field("movie_api_base_url", &self.movie_api_base_url)
            .field(
                "movie_api_key",
                &self.movie_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWKS scheme configuration: {0}")]
    InvalidJwksScheme(String),

    #[error("Invalid development mode configuration: {0}")]
    InvalidDevelopmentMode(String),

    #[error("Invalid rate limit configuration: {0}")]
    InvalidRateLimit(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let issuer_domain = non_empty(vars, "AUTH_ISSUER_DOMAIN");
        let audience = non_empty(vars, "AUTH_AUDIENCE");
        let custom_domain = non_empty(vars, "CUSTOM_DOMAIN");

        let jwks_scheme = match vars.get("AUTH_JWKS_SCHEME").map(String::as_str) {
            None => DEFAULT_JWKS_SCHEME.to_string(),
            Some(scheme @ ("https" | "http")) => scheme.to_string(),
            Some(other) => {
                return Err(ConfigError::InvalidJwksScheme(format!(
                    "AUTH_JWKS_SCHEME must be 'https' or 'http', got '{}'",
                    other
                )));
            }
        };

        let app_name = vars
            .get("APP_NAME")
            .cloned()
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let preview_domain = vars
            .get("PREVIEW_DOMAIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_PREVIEW_DOMAIN.to_string());

        let development_mode = match vars.get("DEVELOPMENT_MODE").map(String::as_str) {
            None | Some("false" | "0" | "") => false,
            Some("true" | "1") => true,
            Some(other) => {
                return Err(ConfigError::InvalidDevelopmentMode(format!(
                    "DEVELOPMENT_MODE must be 'true' or 'false', got '{}'",
                    other
                )));
            }
        };

        let client_ip_header = vars
            .get("CLIENT_IP_HEADER")
            .map(|h| h.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_CLIENT_IP_HEADER.to_string());

        // Parse rate limit with validation
        let rate_limit_per_window = if let Some(value_str) = vars.get("RATE_LIMIT_PER_WINDOW") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRateLimit(format!(
                    "RATE_LIMIT_PER_WINDOW must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRateLimit(
                    "RATE_LIMIT_PER_WINDOW must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_RATE_LIMIT_PER_WINDOW
        };

        let rate_limit_window_seconds =
            if let Some(value_str) = vars.get("RATE_LIMIT_WINDOW_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidRateLimit(format!(
                        "RATE_LIMIT_WINDOW_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidRateLimit(
                        "RATE_LIMIT_WINDOW_SECONDS must be greater than 0".to_string(),
                    ));
                }

                if value > MAX_RATE_LIMIT_WINDOW_SECONDS {
                    return Err(ConfigError::InvalidRateLimit(format!(
                        "RATE_LIMIT_WINDOW_SECONDS must be at most {}, got {}",
                        MAX_RATE_LIMIT_WINDOW_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_RATE_LIMIT_WINDOW_SECONDS
            };

        let movie_api_base_url = vars
            .get("MOVIE_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_MOVIE_API_BASE_URL.to_string());

        let movie_api_key = non_empty(vars, "MOVIE_API_KEY").map(SecretString::from);

        Ok(Config {
            bind_address,
            issuer_domain,
            audience,
            jwks_scheme,
            custom_domain,
            app_name,
            preview_domain,
            development_mode,
            client_ip_header,
            rate_limit_per_window,
            rate_limit_window_seconds,
            movie_api_base_url,
            movie_api_key,
        })
    }

    /// Expected `iss` claim derived from the issuer domain.
    pub fn expected_issuer(&self) -> Option<String> {
        self.issuer_domain
            .as_ref()
            .map(|domain| format!("https://{}/", domain))
    }
}

fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
