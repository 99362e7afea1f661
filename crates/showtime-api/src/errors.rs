//! Showtimes API error types.
//!
//! Every failure is a variant of [`ApiError`]. Each variant carries a
//! diagnostic string that is logged server-side, and maps to an
//! [`ErrorCategory`] that selects the HTTP status and a fixed client message.
//! The diagnostic only reaches the client in development mode.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::TokenDecodeError;
use serde::Serialize;
use thiserror::Error;

/// Client-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Authorization,
    Validation,
    ExternalApi,
    RateLimit,
    Generic,
}

impl ErrorCategory {
    /// Wire name used in the `error` field of the response body.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Validation => "validation",
            ErrorCategory::ExternalApi => "external_api",
            ErrorCategory::RateLimit => "rate_limit",
            ErrorCategory::Generic => "generic",
        }
    }

    /// Fixed message returned to clients outside development mode.
    pub fn client_message(self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "Authentication failed",
            ErrorCategory::Authorization => "Access denied",
            ErrorCategory::Validation => "Invalid request",
            ErrorCategory::ExternalApi => "External service unavailable",
            ErrorCategory::RateLimit => "Too many requests",
            ErrorCategory::Generic => "An unexpected error occurred",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            ErrorCategory::Authentication => StatusCode::UNAUTHORIZED,
            ErrorCategory::Authorization => StatusCode::FORBIDDEN,
            ErrorCategory::Validation => StatusCode::BAD_REQUEST,
            ErrorCategory::ExternalApi => StatusCode::BAD_GATEWAY,
            ErrorCategory::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ErrorCategory::Generic => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Showtimes API error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token encoding error: {0}")]
    EncodingError(String),

    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("Unknown signing key: {0}")]
    UnknownKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Token expired: {0}")]
    TokenExpired(String),

    #[error("Invalid audience: {0}")]
    InvalidAudience(String),

    #[error("Invalid issuer: {0}")]
    InvalidIssuer(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Origin rejected: {0}")]
    OriginRejected(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Required deployment configuration is absent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Generic(String),
}

impl ApiError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::MalformedToken(_)
            | ApiError::EncodingError(_)
            | ApiError::KeySetUnavailable(_)
            | ApiError::UnknownKey(_)
            | ApiError::InvalidSignature(_)
            | ApiError::TokenExpired(_)
            | ApiError::InvalidAudience(_)
            | ApiError::InvalidIssuer(_)
            | ApiError::MissingCredentials(_) => ErrorCategory::Authentication,
            ApiError::OriginRejected(_) => ErrorCategory::Authorization,
            ApiError::RateLimitExceeded { .. } => ErrorCategory::RateLimit,
            ApiError::UpstreamUnavailable(_) => ErrorCategory::ExternalApi,
            ApiError::BadRequest(_) => ErrorCategory::Validation,
            ApiError::Configuration(_) | ApiError::Generic(_) => ErrorCategory::Generic,
        }
    }

    /// Returns the HTTP status code for this error (for metrics recording).
    pub fn status_code(&self) -> u16 {
        self.category().status().as_u16()
    }

    /// Short, bounded-cardinality label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MalformedToken(_) => "malformed_token",
            ApiError::EncodingError(_) => "encoding_error",
            ApiError::KeySetUnavailable(_) => "key_set_unavailable",
            ApiError::UnknownKey(_) => "unknown_key",
            ApiError::InvalidSignature(_) => "invalid_signature",
            ApiError::TokenExpired(_) => "token_expired",
            ApiError::InvalidAudience(_) => "invalid_audience",
            ApiError::InvalidIssuer(_) => "invalid_issuer",
            ApiError::MissingCredentials(_) => "missing_credentials",
            ApiError::OriginRejected(_) => "origin_rejected",
            ApiError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            ApiError::UpstreamUnavailable(_) => "upstream_unavailable",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Configuration(_) => "configuration",
            ApiError::Generic(_) => "generic",
        }
    }

    /// Log the full diagnostic and build the sanitized client response.
    ///
    /// With `development_mode` the raw message is returned and `debug: true`
    /// is set in the body.
    pub fn to_response(&self, development_mode: bool) -> Response {
        let category = self.category();
        let status = category.status();

        if status.is_server_error() {
            tracing::error!(
                target: "showtime.errors",
                kind = self.kind(),
                category = category.as_str(),
                error = %self,
                "Request failed"
            );
        } else {
            tracing::warn!(
                target: "showtime.errors",
                kind = self.kind(),
                category = category.as_str(),
                error = %self,
                "Request rejected"
            );
        }

        let body = if development_mode {
            ErrorBody {
                error: category.as_str(),
                message: self.to_string(),
                debug: Some(true),
            }
        } else {
            ErrorBody {
                error: category.as_str(),
                message: category.client_message().to_string(),
                debug: None,
            }
        };

        let mut response = (status, Json(body)).into_response();

        match self {
            ApiError::RateLimitExceeded { retry_after_secs } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
            }
            _ if status == StatusCode::UNAUTHORIZED => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(
                        "Bearer realm=\"showtimes\", error=\"invalid_token\"",
                    ),
                );
            }
            _ => {}
        }

        response
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<bool>,
}

/// Production-mode rendering.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_response(false)
    }
}

/// An error paired with the rendering mode chosen by configuration.
#[derive(Debug)]
pub struct SanitizedError {
    pub error: ApiError,
    pub development_mode: bool,
}

impl IntoResponse for SanitizedError {
    fn into_response(self) -> Response {
        self.error.to_response(self.development_mode)
    }
}

impl From<TokenDecodeError> for ApiError {
    fn from(err: TokenDecodeError) -> Self {
        match err {
            TokenDecodeError::Malformed(msg) => ApiError::MalformedToken(msg),
            TokenDecodeError::Encoding(msg) => ApiError::EncodingError(msg),
        }
    }
}
