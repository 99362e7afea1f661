//! HTTP routes for the Showtimes API.
//!
//! Defines the Axum router and application state.

use crate::auth::RequestAuthorizer;
use crate::config::Config;
use crate::errors::{ApiError, SanitizedError};
use crate::handlers;
use crate::middleware::{authorize_request, http_metrics_middleware, AuthState};
use crate::services::MovieClient;
use axum::{http::StatusCode, middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::metrics::init_metrics_recorder;

/// Request timeout applied to every route.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Authorization middleware state.
    pub auth: Arc<AuthState>,

    /// Movie database proxy client.
    pub movie_client: MovieClient,
}

impl AppState {
    /// Build the state, including the per-process authorizer, from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the movie client cannot be built.
    pub fn from_config(config: Config) -> Result<Self, ApiError> {
        let authorizer = RequestAuthorizer::from_config(&config);
        Self::with_authorizer(config, authorizer)
    }

    /// Build the state around an explicitly constructed authorizer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the movie client cannot be built.
    pub fn with_authorizer(config: Config, authorizer: RequestAuthorizer) -> Result<Self, ApiError> {
        let movie_client = MovieClient::new(
            config.movie_api_base_url.clone(),
            config.movie_api_key.clone(),
        )?;

        Ok(Self {
            auth: Arc::new(AuthState {
                authorizer: Arc::new(authorizer),
                development_mode: config.development_mode,
            }),
            movie_client,
            config,
        })
    }

    /// Pair an error with the configured rendering mode.
    pub fn sanitize(&self, error: ApiError) -> SanitizedError {
        SanitizedError {
            error,
            development_mode: self.config.development_mode,
        }
    }
}

/// Build the application routes.
///
/// - `/health` and `/metrics` are public
/// - everything under `/api` passes through [`authorize_request`], including
///   paths with no route, which answer 404 only once authorized
///
/// Layer order (outermost first): HTTP metrics, timeout, trace.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/me", get(handlers::get_me))
        .route("/movies/search", get(handlers::search_movies))
        .route("/movies/:id", get(handlers::get_movie))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            authorize_request,
        ))
        .with_state(state);

    let public_routes = Router::new().route("/health", get(handlers::health_check));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(public_routes)
        .merge(metrics_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(middleware::from_fn(http_metrics_middleware))
}
