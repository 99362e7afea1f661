//! Movie database HTTP client.
//!
//! A thin pass-through: upstream JSON is returned to the caller without
//! interpretation.
//!
//! # Security
//!
//! - The API key is a `SecretString` and only exposed when building the URL
//! - Upstream failures are logged server-side; clients see a generic
//!   external-service error

use crate::errors::ApiError;
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{instrument, warn};

/// Upstream request timeout.
pub const MOVIE_API_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the movie database API.
#[derive(Clone)]
pub struct MovieClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl MovieClient {
    /// Create a client for `base_url` (without trailing slash).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the HTTP client cannot be built.
    pub fn new(base_url: String, api_key: Option<SecretString>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(MOVIE_API_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Search movies by title.
    ///
    /// # Errors
    ///
    /// - `BadRequest` - empty query
    /// - `Configuration` - no API key configured
    /// - `UpstreamUnavailable` - upstream unreachable, timed out or non-2xx
    #[instrument(skip(self), name = "showtime.services.movies.search")]
    pub async fn search(&self, query: &str) -> Result<Value, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ApiError::BadRequest("query must not be empty".to_string()));
        }

        self.get_json("/search/movie", &[("query", query)]).await
    }

    /// Fetch a movie by its numeric id.
    ///
    /// # Errors
    ///
    /// - `BadRequest` - `id` is not a non-negative integer
    /// - `Configuration` / `UpstreamUnavailable` - as for [`MovieClient::search`]
    #[instrument(skip(self), name = "showtime.services.movies.details")]
    pub async fn movie_details(&self, id: &str) -> Result<Value, ApiError> {
        let id: u64 = id
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("movie id '{}' is not numeric", id)))?;

        self.get_json(&format!("/movie/{}", id), &[]).await
    }

    async fn get_json(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ApiError::Configuration("MOVIE_API_KEY is not configured".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("api_key", api_key.expose_secret())])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                // The request URL carries the API key as a query parameter.
                let e = e.without_url();
                warn!(target: "showtime.services.movies", error = %e, path = %path, "Movie API request failed");
                ApiError::UpstreamUnavailable(format!("movie API request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "showtime.services.movies", status = %status, path = %path, "Movie API returned error status");
            return Err(ApiError::UpstreamUnavailable(format!(
                "movie API returned {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            let e = e.without_url();
            warn!(target: "showtime.services.movies", error = %e, "Movie API returned invalid JSON");
            ApiError::UpstreamUnavailable(format!("movie API returned invalid JSON: {}", e))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MovieClient {
        MovieClient::new(server.uri(), Some(SecretString::from("tmdb-key"))).unwrap()
    }

    #[tokio::test]
    async fn test_search_passes_upstream_json_through() {
        let server = MockServer::start().await;
        let body = serde_json::json!({"results": [{"id": 603, "title": "The Matrix"}]});
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("query", "The Matrix"))
            .and(query_param("api_key", "tmdb-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).search("The Matrix").await.unwrap();

        assert_eq!(result, body);
    }

    #[tokio::test]
    async fn test_movie_details_uses_numeric_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/603"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"runtime": 136})),
            )
            .mount(&server)
            .await;

        let result = client_for(&server).movie_details("603").await.unwrap();

        assert_eq!(result["runtime"], 136);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_bad_request() {
        let server = MockServer::start().await;

        let result = client_for(&server).movie_details("603;drop").await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_empty_query_is_bad_request() {
        let server = MockServer::start().await;

        let result = client_for(&server).search("  ").await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_upstream_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).search("Alien").await;

        assert!(matches!(result, Err(ApiError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_api_key_is_configuration_error() {
        let server = MockServer::start().await;
        let client = MovieClient::new(server.uri(), None).unwrap();

        let result = client.search("Alien").await;

        assert!(matches!(result, Err(ApiError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_api_key() {
        let client = MovieClient::new(
            "http://127.0.0.1:1".to_string(),
            Some(SecretString::from("SUPER-SECRET-KEY")),
        )
        .unwrap();

        let err = client.search("alien").await.unwrap_err();

        assert!(matches!(err, ApiError::UpstreamUnavailable(_)));
        assert!(!err.to_string().contains("SUPER-SECRET-KEY"));
        assert!(!format!("{:?}", err).contains("SUPER-SECRET-KEY"));
    }

    #[tokio::test]
    async fn test_invalid_json_error_does_not_leak_api_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).search("alien").await.unwrap_err();

        assert!(matches!(err, ApiError::UpstreamUnavailable(_)));
        assert!(!err.to_string().contains("tmdb-key"));
    }
}
