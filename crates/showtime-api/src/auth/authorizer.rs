//! Request authorization pipeline.
//!
//! Composes the token codec, key-set cache, signature verifier and claims
//! validator, gated by the rate limiter, with origin checks at the boundary.
//! One instance is built per process and shared by reference across requests.
//!
//! # Security
//!
//! - The `kid` is checked before any network call
//! - Signature is verified before any claim is trusted
//! - The first failing stage short-circuits; later stages never run

use crate::auth::claims::{validate_claims, Claims};
use crate::auth::jwks::KeySetCache;
use crate::auth::verifier::verify_signature;
use crate::config::Config;
use crate::errors::ApiError;
use crate::observability::metrics;
use crate::origin::{OriginDecision, OriginValidator};
use crate::rate_limit::{client_identifier, RateLimiter};
use axum::http::{header, HeaderMap};
use common::jwt::decode_token;
use std::time::Duration;
use tracing::instrument;

/// Per-process authorization state and policy.
pub struct RequestAuthorizer {
    key_sets: KeySetCache,
    rate_limiter: RateLimiter,
    origins: OriginValidator,
    issuer_domain: Option<String>,
    expected_issuer: Option<String>,
    audience: Option<String>,
    client_ip_header: String,
}

impl RequestAuthorizer {
    /// Build the authorizer and its state from configuration.
    pub fn from_config(config: &Config) -> Self {
        let key_sets = KeySetCache::with_options(
            &config.jwks_scheme,
            Duration::from_secs(crate::auth::jwks::DEFAULT_CACHE_TTL_SECONDS),
        );
        let rate_limiter = RateLimiter::new(
            config.rate_limit_per_window,
            Duration::from_secs(config.rate_limit_window_seconds),
        );
        Self::new(config, key_sets, rate_limiter)
    }

    /// Build the authorizer around explicitly constructed state.
    pub fn new(config: &Config, key_sets: KeySetCache, rate_limiter: RateLimiter) -> Self {
        Self {
            key_sets,
            rate_limiter,
            origins: OriginValidator::from_config(config),
            issuer_domain: config.issuer_domain.clone(),
            expected_issuer: config.expected_issuer(),
            audience: config.audience.clone(),
            client_ip_header: config.client_ip_header.clone(),
        }
    }

    /// Classify the request's `Origin` header against the allow-list.
    pub fn authorize_origin(&self, headers: &HeaderMap) -> OriginDecision {
        self.origins.authorize_origin(headers)
    }

    /// Count this request against its client's rate limit.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RateLimitExceeded` when the client is over its limit.
    pub fn check_rate_limit(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let client = client_identifier(headers, &self.client_ip_header);
        if self.rate_limiter.allow(&client) {
            Ok(())
        } else {
            metrics::record_rate_limited();
            Err(ApiError::RateLimitExceeded {
                retry_after_secs: self.rate_limiter.retry_after_secs(),
            })
        }
    }

    /// Authenticate a request from its headers.
    ///
    /// # Errors
    ///
    /// - `Configuration` - issuer domain or audience is not configured
    /// - `MissingCredentials` - no usable `Authorization: Bearer` header
    /// - any error of [`RequestAuthorizer::validate_token`]
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Claims, ApiError> {
        let settings = self.required_settings()?;
        let token = extract_bearer_token(headers)?;
        self.validate_with(token, settings).await
    }

    /// Validate a bearer token and return its claims.
    ///
    /// Stages run in order: decode, key-set fetch, signature, claims.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` / `EncodingError` - token cannot be decoded
    /// - `UnknownKey` - header has no `kid`, or the key set lacks it
    /// - `KeySetUnavailable` - key set cannot be fetched and nothing is cached
    /// - `InvalidSignature` - signature does not verify
    /// - `TokenExpired` / `InvalidAudience` / `InvalidIssuer` - claim checks
    pub async fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let settings = self.required_settings()?;
        self.validate_with(token, settings).await
    }

    #[instrument(skip_all)]
    async fn validate_with(
        &self,
        token: &str,
        settings: IssuerSettings<'_>,
    ) -> Result<Claims, ApiError> {
        let decoded = decode_token(token)?;

        if decoded.header.kid().is_none() {
            return Err(ApiError::UnknownKey(
                "token header has no kid".to_string(),
            ));
        }

        let key_set = self.key_sets.get_key_set(settings.domain).await?;

        let valid = verify_signature(
            &decoded.header,
            decoded.signing_input(),
            &decoded.signature,
            &key_set,
        )?;
        if !valid {
            return Err(ApiError::InvalidSignature(
                "signature does not match key".to_string(),
            ));
        }

        let claims = validate_claims(
            &decoded.payload,
            Some(settings.audience),
            settings.issuer,
            chrono::Utc::now().timestamp(),
        )?;

        tracing::debug!(target: "showtime.auth", "Token validated successfully");
        Ok(claims)
    }

    fn required_settings(&self) -> Result<IssuerSettings<'_>, ApiError> {
        let (Some(domain), Some(issuer)) = (&self.issuer_domain, &self.expected_issuer) else {
            return Err(ApiError::Configuration(
                "AUTH_ISSUER_DOMAIN is not configured".to_string(),
            ));
        };
        let audience = self.audience.as_deref().ok_or_else(|| {
            ApiError::Configuration("AUTH_AUDIENCE is not configured".to_string())
        })?;
        Ok(IssuerSettings {
            domain,
            issuer,
            audience,
        })
    }
}

#[derive(Clone, Copy)]
struct IssuerSettings<'a> {
    domain: &'a str,
    issuer: &'a str,
    audience: &'a str,
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// # Errors
///
/// Returns `ApiError::MissingCredentials` if the header is absent, not
/// valid UTF-8, not a Bearer credential, or empty.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::MissingCredentials("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| {
            ApiError::MissingCredentials("Authorization header is not valid UTF-8".to_string())
        })?;

    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| {
            ApiError::MissingCredentials("Authorization header is not a Bearer credential".to_string())
        })?;

    if token.is_empty() {
        return Err(ApiError::MissingCredentials(
            "empty Bearer token".to_string(),
        ));
    }

    Ok(token)
}
