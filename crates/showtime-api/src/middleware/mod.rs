//! HTTP middleware for the Showtimes API.
//!
//! - `auth` - origin, rate limit and Bearer token checks for `/api` routes
//! - `http_metrics` - request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{authorize_request, AuthState, ClaimsExt};
pub use http_metrics::http_metrics_middleware;
