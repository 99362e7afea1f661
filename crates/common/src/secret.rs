//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports types from the [`secrecy`] crate. Use these for upstream API
//! keys and bearer tokens so that any `Debug` derive on a containing struct
//! redacts them automatically.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct UpstreamCredentials {
//!     base_url: String,
//!     api_key: SecretString,
//! }
//!
//! let creds = UpstreamCredentials {
//!     base_url: "https://api.example.com".to_string(),
//!     api_key: SecretString::from("k-123"),
//! };
//!
//! assert!(!format!("{:?}", creds).contains("k-123"));
//! assert_eq!(creds.api_key.expose_secret(), "k-123");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_string_debug_is_redacted() {
        let secret = SecretString::from("super-secret-api-key");
        let debug = format!("{secret:?}");

        assert!(!debug.contains("super-secret-api-key"));
        assert_eq!(secret.expose_secret(), "super-secret-api-key");
    }
}
