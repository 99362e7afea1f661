//! Current user handler.
//!
//! Echoes profile claims from the validated token.

use crate::auth::Claims;
use axum::{Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `/api/me`.
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// Subject (user id at the identity provider).
    pub sub: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Token expiration timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl From<Claims> for MeResponse {
    fn from(claims: Claims) -> Self {
        Self {
            sub: claims.sub,
            name: claims.name,
            email: claims.email,
            picture: claims.picture,
            exp: claims.exp,
        }
    }
}

/// Handler for GET /api/me
///
/// Requires the authorization middleware to have stored the claims.
///
/// ```json
/// {
///   "sub": "auth0|abc123",
///   "name": "Ada Lovelace",
///   "email": "ada@example.com",
///   "exp": 1700003600
/// }
/// ```
#[instrument(skip_all, name = "showtime.handlers.me")]
pub async fn get_me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    tracing::debug!(target: "showtime.handlers.me", "Returning user claims");
    Json(MeResponse::from(claims))
}
