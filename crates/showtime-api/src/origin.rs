//! Cross-origin request validation.
//!
//! The allow-list is built once from configuration:
//!
//! - the expected audience URL (the deployed app)
//! - fixed local development origins
//! - the custom domain, when configured
//! - a rule for preview deployments:
//!   `https://<label>-{app_name}.<account>.{preview_domain}`
//!
//! Exact entries are checked before pattern rules; the first match wins.

use crate::config::Config;
use axum::http::{header, HeaderMap, HeaderValue};
use regex::Regex;

/// Origins used by the local development server.
pub const LOCAL_DEVELOPMENT_ORIGINS: &[&str] = &["http://localhost:8787", "http://127.0.0.1:8787"];

/// Methods advertised in preflight responses.
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// Request headers advertised in preflight responses.
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Preflight cache lifetime in seconds.
pub const PREFLIGHT_MAX_AGE_SECONDS: u32 = 86400;

/// Result of validating a request's `Origin` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// No `Origin` header: same-origin request, no CORS headers.
    SameOrigin,
    /// Allowed cross-origin request; the origin is echoed back.
    Allowed(String),
    /// Cross-origin request from an origin not on the allow-list.
    Denied(String),
}

/// Allow-list of exact origins and preview-deployment rules.
#[derive(Debug, Clone)]
pub struct OriginValidator {
    exact: Vec<String>,
    patterns: Vec<Regex>,
}

impl OriginValidator {
    /// Build the allow-list from configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut exact = Vec::new();

        if let Some(audience) = &config.audience {
            exact.push(audience.trim_end_matches('/').to_string());
        }
        exact.extend(LOCAL_DEVELOPMENT_ORIGINS.iter().map(|o| (*o).to_string()));
        if let Some(domain) = &config.custom_domain {
            exact.push(format!("https://{}", domain));
        }

        let mut patterns = Vec::new();
        match preview_pattern(&config.app_name, &config.preview_domain) {
            Ok(pattern) => patterns.push(pattern),
            Err(e) => {
                tracing::warn!(target: "showtime.origin", error = %e, "Preview origin rule disabled");
            }
        }

        Self { exact, patterns }
    }

    /// Return the origin to echo back, or `None` if it is not allowed.
    pub fn resolve_allowed_origin(&self, origin: &str) -> Option<String> {
        if self.exact.iter().any(|allowed| allowed == origin) {
            return Some(origin.to_string());
        }
        if self.patterns.iter().any(|pattern| pattern.is_match(origin)) {
            return Some(origin.to_string());
        }
        None
    }

    /// Classify a request by its `Origin` header.
    pub fn authorize_origin(&self, headers: &HeaderMap) -> OriginDecision {
        let Some(value) = headers.get(header::ORIGIN) else {
            return OriginDecision::SameOrigin;
        };

        let origin = value.to_str().unwrap_or_default();
        match self.resolve_allowed_origin(origin) {
            Some(allowed) => OriginDecision::Allowed(allowed),
            None => {
                tracing::debug!(target: "showtime.origin", origin = %origin, "Origin not on allow-list");
                OriginDecision::Denied(origin.to_string())
            }
        }
    }
}

fn preview_pattern(app_name: &str, preview_domain: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^https://[a-z0-9]+(?:-[a-z0-9]+)*-{}\.[a-z0-9-]+\.{}$",
        regex::escape(app_name),
        regex::escape(preview_domain)
    ))
}

/// Add CORS response headers for an allowed origin.
pub fn apply_cors_headers(headers: &mut HeaderMap, allowed_origin: &str) {
    let Ok(origin) = HeaderValue::from_str(allowed_origin) else {
        return;
    };

    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from(PREFLIGHT_MAX_AGE_SECONDS),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn validator_with(extra: &[(&str, &str)]) -> OriginValidator {
        let mut vars = HashMap::from([(
            "AUTH_AUDIENCE".to_string(),
            "https://showtimes.example.com".to_string(),
        )]);
        for (k, v) in extra {
            vars.insert((*k).to_string(), (*v).to_string());
        }
        OriginValidator::from_config(&Config::from_vars(&vars).unwrap())
    }

    #[test]
    fn test_local_development_origin_allowed() {
        let validator = validator_with(&[]);
        assert_eq!(
            validator.resolve_allowed_origin("http://localhost:8787").as_deref(),
            Some("http://localhost:8787")
        );
    }

    #[test]
    fn test_audience_origin_allowed() {
        let validator = validator_with(&[]);
        assert!(validator
            .resolve_allowed_origin("https://showtimes.example.com")
            .is_some());
    }

    #[test]
    fn test_unknown_origin_rejected() {
        let validator = validator_with(&[]);
        assert!(validator
            .resolve_allowed_origin("https://evil.example.com")
            .is_none());
    }

    #[test]
    fn test_custom_domain_allowed_only_when_configured() {
        assert!(validator_with(&[])
            .resolve_allowed_origin("https://movies.example.org")
            .is_none());
        assert!(validator_with(&[("CUSTOM_DOMAIN", "movies.example.org")])
            .resolve_allowed_origin("https://movies.example.org")
            .is_some());
    }

    #[test]
    fn test_preview_subdomain_allowed() {
        let validator = validator_with(&[]);

        assert!(validator
            .resolve_allowed_origin("https://feature-x-showtimes.acme.workers.dev")
            .is_some());
        assert!(validator
            .resolve_allowed_origin("https://abc123-showtimes.acme-corp.workers.dev")
            .is_some());
    }

    #[test]
    fn test_preview_lookalikes_rejected() {
        let validator = validator_with(&[]);

        for origin in [
            "http://feature-showtimes.acme.workers.dev",
            "https://feature-showtimes.acme.workers.dev.evil.com",
            "https://feature-other.acme.workers.dev",
            "https://showtimes.acme.workers.dev",
            "https://feature-showtimes.acme.workersXdev",
        ] {
            assert!(
                validator.resolve_allowed_origin(origin).is_none(),
                "{origin} must be rejected"
            );
        }
    }

    #[test]
    fn test_preview_rule_uses_configured_app_name() {
        let validator = validator_with(&[("APP_NAME", "movie-times")]);

        assert!(validator
            .resolve_allowed_origin("https://pr-7-movie-times.acme.workers.dev")
            .is_some());
        assert!(validator
            .resolve_allowed_origin("https://pr-7-showtimes.acme.workers.dev")
            .is_none());
    }

    #[test]
    fn test_authorize_origin_classifies_requests() {
        let validator = validator_with(&[]);

        assert_eq!(
            validator.authorize_origin(&HeaderMap::new()),
            OriginDecision::SameOrigin
        );

        let mut allowed = HeaderMap::new();
        allowed.insert(header::ORIGIN, HeaderValue::from_static("http://localhost:8787"));
        assert_eq!(
            validator.authorize_origin(&allowed),
            OriginDecision::Allowed("http://localhost:8787".to_string())
        );

        let mut denied = HeaderMap::new();
        denied.insert(header::ORIGIN, HeaderValue::from_static("https://evil.example.com"));
        assert_eq!(
            validator.authorize_origin(&denied),
            OriginDecision::Denied("https://evil.example.com".to_string())
        );
    }

    #[test]
    fn test_apply_cors_headers() {
        let mut headers = HeaderMap::new();
        apply_cors_headers(&mut headers, "http://localhost:8787");

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:8787"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            ALLOWED_METHODS
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            ALLOWED_HEADERS
        );
        assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "86400");
    }
}
