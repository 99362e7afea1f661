//! Token claims and their validation.
//!
//! Contains the claims extracted from verified tokens. The `sub` and
//! `email` fields are redacted in Debug output to keep them out of logs.

use crate::errors::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The `aud` claim: a single audience or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// Equal (single) or contained (list).
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

/// Claims of a validated token.
///
/// Unrecognized claims are preserved in `extra` so the payload round-trips
/// unmodified.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id at the identity provider) - redacted in Debug output.
    pub sub: String,

    /// Issuer URL.
    pub iss: String,

    /// Audience.
    pub aud: Audience,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Any other claims the provider included.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("name", &self.name)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("picture", &self.picture)
            .finish_non_exhaustive()
    }
}

/// Validate decoded (and signature-verified) payload claims.
///
/// Checks run in order: expiry, audience, issuer.
///
/// # Arguments
///
/// * `payload` - Decoded token payload
/// * `expected_audience` - Required `aud` value; `None` skips the check
/// * `expected_issuer` - Required `iss` value (`https://{issuer_domain}/`)
/// * `now` - Current Unix time in seconds
///
/// # Errors
///
/// - `MalformedToken` - `exp` is missing or not an integer, or a claim has the wrong type
/// - `TokenExpired` - `exp < now`
/// - `InvalidAudience` - `aud` does not equal/contain the expected audience
/// - `InvalidIssuer` - `iss` differs from the expected issuer
pub fn validate_claims(
    payload: &Map<String, Value>,
    expected_audience: Option<&str>,
    expected_issuer: &str,
    now: i64,
) -> Result<Claims, ApiError> {
    let exp = match payload.get("exp") {
        Some(value) => value.as_i64().ok_or_else(|| {
            ApiError::MalformedToken(format!("exp claim is not an integer: {}", value))
        })?,
        None => {
            return Err(ApiError::MalformedToken(
                "payload has no exp claim".to_string(),
            ))
        }
    };
    if exp < now {
        return Err(ApiError::TokenExpired(format!(
            "exp {} is before now {}",
            exp, now
        )));
    }

    if let Some(expected) = expected_audience {
        let aud = match payload.get("aud") {
            Some(value) => Some(Audience::deserialize(value).map_err(|e| {
                ApiError::MalformedToken(format!("aud claim is invalid: {}", e))
            })?),
            None => None,
        };
        if !aud.as_ref().is_some_and(|aud| aud.contains(expected)) {
            return Err(ApiError::InvalidAudience(format!(
                "aud {:?} does not contain '{}'",
                aud, expected
            )));
        }
    }

    let iss = payload.get("iss").and_then(Value::as_str);
    if iss != Some(expected_issuer) {
        return Err(ApiError::InvalidIssuer(format!(
            "iss {:?} does not match '{}'",
            iss, expected_issuer
        )));
    }

    let claims: Claims = serde_json::from_value(Value::Object(payload.clone()))
        .map_err(|e| ApiError::MalformedToken(format!("payload claims are invalid: {}", e)))?;

    Ok(claims)
}
