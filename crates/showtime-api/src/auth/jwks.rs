//! Key-set cache for the identity provider's signing keys.
//!
//! Fetches `https://{issuer_domain}/.well-known/jwks.json` and caches the
//! result per issuer domain.
//!
//! # Cache Behavior
//!
//! - An entry younger than the TTL (5 minutes) is served without a fetch.
//! - Otherwise the key set is fetched. A non-success status, a transport
//!   error or timeout, an unparseable body, or an empty `keys` array all
//!   count as a failed fetch.
//! - On a failed fetch the previous entry, however old, is served and the
//!   degradation is logged. With no previous entry the call fails with
//!   `KeySetUnavailable`.
//!
//! The lock is never held across the network fetch. Two requests that miss
//! at the same time may both fetch; the later write wins.

use crate::errors::ApiError;
use crate::observability::metrics;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Default cache TTL in seconds (5 minutes).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 300;

/// Timeout for a single JWKS fetch.
pub const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Well-known path of the key set document.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// JSON Web Key from the JWKS endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Jwk {
    /// Key type ("RSA" for RS256 keys). Empty when the provider omits it.
    #[serde(default)]
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: String,

    /// RSA modulus (base64url, big-endian).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url, big-endian).
    #[serde(default)]
    pub e: Option<String>,

    /// Algorithm the key is intended for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// Ordered collection of signing keys as published by the provider.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KeySet {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

impl KeySet {
    /// Find the key whose `kid` equals `kid`.
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Cached key set with the time it was fetched.
struct CachedKeySet {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

/// Process-wide key-set cache keyed by issuer domain.
pub struct KeySetCache {
    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,

    /// "https" in production; "http" only for local mock providers.
    scheme: String,

    /// Cached key sets by issuer domain.
    cache: RwLock<HashMap<String, CachedKeySet>>,

    /// Cache TTL duration.
    cache_ttl: Duration,
}

impl KeySetCache {
    /// Create a cache with an explicit scheme and TTL.
    ///
    /// # Arguments
    ///
    /// * `scheme` - URL scheme of the discovery endpoint
    /// * `cache_ttl` - How long a fetched key set is served without refetching
    pub fn with_options(scheme: &str, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "showtime.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            http_client,
            scheme: scheme.to_string(),
            cache: RwLock::new(HashMap::new()),
            cache_ttl,
        }
    }

    /// Discovery URL for an issuer domain.
    pub fn jwks_url(&self, issuer_domain: &str) -> String {
        format!("{}://{}{}", self.scheme, issuer_domain, JWKS_PATH)
    }

    /// Get the key set for an issuer domain.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::KeySetUnavailable` if the fetch fails and no
    /// previous key set is cached for this issuer.
    #[instrument(skip(self), fields(issuer_domain = %issuer_domain))]
    pub async fn get_key_set(&self, issuer_domain: &str) -> Result<Arc<KeySet>, ApiError> {
        let stale = {
            let cache = self.cache.read().await;
            match cache.get(issuer_domain) {
                Some(cached) if cached.fetched_at.elapsed() < self.cache_ttl => {
                    tracing::debug!(target: "showtime.auth.jwks", "JWKS cache hit");
                    return Ok(Arc::clone(&cached.keys));
                }
                Some(cached) => Some(Arc::clone(&cached.keys)),
                None => None,
            }
        };

        match self.fetch(issuer_domain).await {
            Ok(key_set) => {
                let keys = Arc::new(key_set);
                tracing::info!(
                    target: "showtime.auth.jwks",
                    key_count = keys.len(),
                    "JWKS cache refreshed"
                );
                metrics::record_jwks_fetch("success");

                let mut cache = self.cache.write().await;
                cache.insert(
                    issuer_domain.to_string(),
                    CachedKeySet {
                        keys: Arc::clone(&keys),
                        fetched_at: Instant::now(),
                    },
                );
                Ok(keys)
            }
            Err(reason) => match stale {
                Some(keys) => {
                    tracing::warn!(
                        target: "showtime.auth.jwks",
                        reason = %reason,
                        "JWKS fetch failed, serving stale key set (degraded)"
                    );
                    metrics::record_jwks_fetch("stale");
                    Ok(keys)
                }
                None => {
                    tracing::error!(
                        target: "showtime.auth.jwks",
                        reason = %reason,
                        "JWKS fetch failed and no cached key set exists"
                    );
                    metrics::record_jwks_fetch("error");
                    Err(ApiError::KeySetUnavailable(reason))
                }
            },
        }
    }

    /// Fetch and parse the key set. Errors are diagnostic strings.
    async fn fetch(&self, issuer_domain: &str) -> Result<KeySet, String> {
        let url = self.jwks_url(issuer_domain);
        tracing::debug!(target: "showtime.auth.jwks", url = %url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request to {} failed: {}", url, e))?;

        if !response.status().is_success() {
            return Err(format!("{} returned status {}", url, response.status()));
        }

        let key_set: KeySet = response
            .json()
            .await
            .map_err(|e| format!("invalid JWKS body from {}: {}", url, e))?;

        if key_set.is_empty() {
            return Err(format!("{} returned an empty key set", url));
        }

        Ok(key_set)
    }

    /// Drop every cached key set.
    #[cfg(test)]
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }
}
