//! Builder for test token claims.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Builder for identity-provider style claims.
///
/// # Example
/// ```rust,ignore
/// let claims = TestClaimsBuilder::new("tenant.auth.example.com", "https://showtimes.example.com")
///     .for_user("auth0|alice")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestClaimsBuilder {
    sub: String,
    iss: String,
    aud: Value,
    exp: Option<i64>,
    extra: Map<String, Value>,
}

impl TestClaimsBuilder {
    /// Claims valid for one hour, issued by `https://{issuer_domain}/`.
    pub fn new(issuer_domain: &str, audience: &str) -> Self {
        Self {
            sub: "auth0|test-user".to_string(),
            iss: format!("https://{}/", issuer_domain),
            aud: json!([audience, format!("https://{}/userinfo", issuer_domain)]),
            exp: Some((Utc::now() + Duration::seconds(3600)).timestamp()),
            extra: Map::new(),
        }
    }

    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    pub fn issuer(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }

    /// Replace `aud` with a single string.
    pub fn audience(mut self, aud: &str) -> Self {
        self.aud = json!(aud);
        self
    }

    /// Set expiration in seconds from now (negative for an expired token).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    pub fn without_exp(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Add a profile or custom claim.
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    pub fn build(self) -> Value {
        let mut claims = self.extra;
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("aud".to_string(), self.aud);
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        Value::Object(claims)
    }
}
