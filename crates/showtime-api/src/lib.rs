//! Showtimes API Library
//!
//! Bearer-token request authorization in front of a thin movie database
//! proxy. Tokens are RS256 JWTs issued by an external identity provider and
//! verified against its published key set.
//!
//! # Request flow
//!
//! ```text
//! origin check -> preflight -> rate limit -> token decode -> key set
//!   -> signature -> claims -> handler
//! ```
//!
//! # Modules
//!
//! - `auth` - key-set cache, signature verification, claims, authorizer
//! - `config` - service configuration from environment
//! - `errors` - error taxonomy and sanitized client responses
//! - `handlers` - HTTP request handlers
//! - `middleware` - authorization and HTTP metrics middleware
//! - `observability` - Prometheus metrics
//! - `origin` - CORS origin allow-list
//! - `rate_limit` - per-client fixed-window rate limiting
//! - `routes` - Axum router setup
//! - `services` - outbound movie database client

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod origin;
pub mod rate_limit;
pub mod routes;
pub mod services;
