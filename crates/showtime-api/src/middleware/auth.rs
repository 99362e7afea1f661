//! Request authorization middleware for `/api` routes.
//!
//! Runs the checks in a fixed order and stops at the first failure:
//!
//! 1. Origin - a disallowed `Origin` is rejected with 403 and no CORS headers
//! 2. Preflight - `OPTIONS` is answered with 204 and CORS headers
//! 3. Rate limit - one count per request, before any token work
//! 4. Authentication - Bearer token validation
//!
//! Validated claims are stored in request extensions for handlers. Every
//! response to an allowed cross-origin request carries CORS headers,
//! including error responses.

use crate::auth::{Claims, RequestAuthorizer};
use crate::errors::{ApiError, SanitizedError};
use crate::observability::metrics;
use crate::origin::{apply_cors_headers, OriginDecision};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authorization middleware.
#[derive(Clone)]
pub struct AuthState {
    /// Shared authorization pipeline.
    pub authorizer: Arc<RequestAuthorizer>,

    /// Return raw error messages to clients.
    pub development_mode: bool,
}

/// Authorize a request before it reaches an `/api` handler.
///
/// # Response
///
/// - 403 if the `Origin` header is not on the allow-list
/// - 204 for CORS preflight requests
/// - 429 with `Retry-After` when the client is over its rate limit
/// - 401 with `WWW-Authenticate` if the token is missing or invalid
/// - 500 if the issuer domain or audience is not configured
#[instrument(skip_all, name = "showtime.middleware.auth", fields(method = %req.method()))]
pub async fn authorize_request(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let allowed_origin = match state.authorizer.authorize_origin(req.headers()) {
        OriginDecision::SameOrigin => None,
        OriginDecision::Allowed(origin) => Some(origin),
        OriginDecision::Denied(origin) => {
            return state
                .reject(ApiError::OriginRejected(format!(
                    "origin '{}' is not allowed",
                    origin
                )))
                .into_response();
        }
    };

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        let outcome = state.authorize(req.headers()).await;
        match outcome {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                next.run(req).await
            }
            Err(error) => state.reject(error).into_response(),
        }
    };

    if let Some(origin) = allowed_origin {
        apply_cors_headers(response.headers_mut(), &origin);
    }
    response
}

impl AuthState {
    async fn authorize(&self, headers: &HeaderMap) -> Result<Claims, ApiError> {
        self.authorizer.check_rate_limit(headers)?;

        let claims = self.authorizer.authenticate(headers).await?;
        metrics::record_auth_outcome("success");
        Ok(claims)
    }

    fn reject(&self, error: ApiError) -> SanitizedError {
        metrics::record_auth_outcome(error.kind());
        tracing::debug!(target: "showtime.middleware.auth", kind = error.kind(), "Request not authorized");
        SanitizedError {
            error,
            development_mode: self.development_mode,
        }
    }
}

/// Access to the authenticated claims from a request.
pub trait ClaimsExt {
    /// Returns `None` if the auth middleware was not applied to this request.
    fn claims(&self) -> Option<&Claims>;
}

impl<B> ClaimsExt for axum::extract::Request<B> {
    fn claims(&self) -> Option<&Claims> {
        self.extensions().get::<Claims>()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest},
        middleware,
        routing::get,
        Router,
    };
    use std::collections::HashMap;
    use tower::ServiceExt;

    async fn handler(req: Request) -> &'static str {
        if req.claims().is_some() {
            "claims"
        } else {
            "anonymous"
        }
    }

    fn app(vars: &[(&str, &str)]) -> Router {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let config = Config::from_vars(&vars).unwrap();
        let state = Arc::new(AuthState {
            authorizer: Arc::new(RequestAuthorizer::from_config(&config)),
            development_mode: config.development_mode,
        });

        Router::new()
            .route("/api/me", get(handler).options(handler))
            .layer(middleware::from_fn_with_state(state, authorize_request))
    }

    fn configured_app() -> Router {
        app(&[
            ("AUTH_ISSUER_DOMAIN", "127.0.0.1:9"),
            ("AUTH_AUDIENCE", "https://showtimes.example.com"),
            ("AUTH_JWKS_SCHEME", "http"),
        ])
    }

    #[tokio::test]
    async fn test_disallowed_origin_is_forbidden_without_cors() {
        let request = HttpRequest::builder()
            .uri("/api/me")
            .header(header::ORIGIN, "https://evil.example.com")
            .body(Body::empty())
            .unwrap();

        let response = configured_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_preflight_short_circuits_with_cors() {
        let request = HttpRequest::builder()
            .method(Method::OPTIONS)
            .uri("/api/me")
            .header(header::ORIGIN, "http://localhost:8787")
            .body(Body::empty())
            .unwrap();

        let response = configured_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:8787"
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_is_unauthorized_with_cors() {
        let request = HttpRequest::builder()
            .uri("/api/me")
            .header(header::ORIGIN, "http://localhost:8787")
            .body(Body::empty())
            .unwrap();

        let response = configured_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_some());
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_some());
    }

    #[tokio::test]
    async fn test_malformed_token_is_unauthorized_without_network() {
        let request = HttpRequest::builder()
            .uri("/api/me")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();

        let response = configured_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unconfigured_auth_is_server_error() {
        let request = HttpRequest::builder()
            .uri("/api/me")
            .header(header::AUTHORIZATION, "Bearer a.b.c")
            .body(Body::empty())
            .unwrap();

        let response = app(&[]).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_rate_limited_request_gets_retry_after() {
        let app = app(&[
            ("AUTH_ISSUER_DOMAIN", "127.0.0.1:9"),
            ("AUTH_AUDIENCE", "https://showtimes.example.com"),
            ("RATE_LIMIT_PER_WINDOW", "1"),
        ]);

        let request = || {
            HttpRequest::builder()
                .uri("/api/me")
                .header("cf-connecting-ip", "203.0.113.50")
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

        let second = app.oneshot(request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(second.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }

    #[test]
    fn test_auth_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AuthState>();
    }
}
