//! Movie database proxy handlers.

use crate::errors::SanitizedError;
use crate::routes::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Query string for `/api/movies/search`.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

/// Handler for GET /api/movies/search?query=...
#[instrument(skip_all, name = "showtime.handlers.movies.search")]
pub async fn search_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, SanitizedError> {
    state
        .movie_client
        .search(&params.query)
        .await
        .map(Json)
        .map_err(|e| state.sanitize(e))
}

/// Handler for GET /api/movies/{id}
#[instrument(skip_all, name = "showtime.handlers.movies.details")]
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, SanitizedError> {
    state
        .movie_client
        .movie_details(&id)
        .await
        .map(Json)
        .map_err(|e| state.sanitize(e))
}
