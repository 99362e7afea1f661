//! Signed token decoding shared across Showtimes services.
//!
//! This module splits a compact signed token (`header.payload.signature`)
//! into its three segments and decodes them. It performs NO signature or
//! claim verification; callers must verify the signature over
//! [`DecodedToken::signing_input`] before trusting anything in the payload.
//!
//! # Encoding
//!
//! Segments use the URL-safe base64 alphabet. Identity providers disagree on
//! whether trailing `=` padding is emitted, so decoding is padding-indifferent.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE splitting or decoding (DoS prevention)
//! - An empty `kid` header value is reported as absent
//! - Error variants carry diagnostics for server-side logs only

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed token size in bytes (8KB).
///
/// Typical identity provider tokens are well under 2KB. Anything larger is
/// rejected before base64 decoding allocates a buffer for it.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Segment delimiter of the compact serialization.
pub const SEGMENT_DELIMITER: char = '.';

/// URL-safe base64 engine that accepts both padded and unpadded input.
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding a signed token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenDecodeError {
    /// Token does not have the three-segment structure.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// A segment is not valid base64url or not a JSON object.
    #[error("Token encoding error: {0}")]
    Encoding(String),
}

// =============================================================================
// Decoded Types
// =============================================================================

/// Decoded token header (JOSE header).
#[derive(Debug, Clone, PartialEq)]
pub struct TokenHeader {
    fields: Map<String, Value>,
}

impl TokenHeader {
    /// Key identifier used to select the verification key.
    ///
    /// Returns `None` when `kid` is missing, not a string, or empty.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.fields
            .get("kid")
            .and_then(Value::as_str)
            .filter(|kid| !kid.is_empty())
    }

    /// Signature algorithm declared by the token, if any.
    #[must_use]
    pub fn alg(&self) -> Option<&str> {
        self.fields.get("alg").and_then(Value::as_str)
    }

    /// Raw header fields.
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// A token split into its decoded parts.
///
/// Borrows the original token text so that the signature can be checked
/// over the exact encoded bytes the issuer signed.
#[derive(Debug, Clone)]
pub struct DecodedToken<'a> {
    /// Decoded header.
    pub header: TokenHeader,

    /// Decoded payload (unverified claims).
    pub payload: Map<String, Value>,

    /// Raw signature bytes.
    pub signature: Vec<u8>,

    signing_input: &'a str,
}

impl<'a> DecodedToken<'a> {
    /// The bytes covered by the signature: `header_segment.payload_segment`.
    #[must_use]
    pub fn signing_input(&self) -> &'a [u8] {
        self.signing_input.as_bytes()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Decode a base64url segment, tolerating missing padding.
///
/// # Errors
///
/// Returns `TokenDecodeError::Encoding` if the segment is not valid base64url.
pub fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenDecodeError> {
    URL_SAFE_LENIENT
        .decode(segment)
        .map_err(|e| TokenDecodeError::Encoding(format!("invalid base64url segment: {e}")))
}

/// Split and decode a compact signed token.
///
/// # Errors
///
/// - `Malformed` - token exceeds [`MAX_JWT_SIZE_BYTES`] or does not have
///   exactly three `.`-delimited segments
/// - `Encoding` - a segment is not base64url, or the header/payload is not
///   a JSON object
pub fn decode_token(token: &str) -> Result<DecodedToken<'_>, TokenDecodeError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(TokenDecodeError::Malformed(format!(
            "token size {} exceeds {} bytes",
            token.len(),
            MAX_JWT_SIZE_BYTES
        )));
    }

    let parts: Vec<&str> = token.split(SEGMENT_DELIMITER).collect();
    let (header_segment, payload_segment, signature_segment) = match parts.as_slice() {
        [header, payload, signature] => (*header, *payload, *signature),
        _ => {
            tracing::debug!(
                target: "common.jwt",
                parts = parts.len(),
                "Token rejected: invalid segment count"
            );
            return Err(TokenDecodeError::Malformed(format!(
                "expected 3 segments, found {}",
                parts.len()
            )));
        }
    };

    let header = TokenHeader {
        fields: decode_json_segment(header_segment, "header")?,
    };
    let payload = decode_json_segment(payload_segment, "payload")?;
    let signature = decode_segment(signature_segment)?;

    // header.len() + '.' + payload.len() is always a char boundary
    let signing_input = token
        .get(..header_segment.len() + 1 + payload_segment.len())
        .ok_or_else(|| TokenDecodeError::Malformed("signing input out of range".to_string()))?;

    Ok(DecodedToken {
        header,
        payload,
        signature,
        signing_input,
    })
}

fn decode_json_segment(segment: &str, name: &str) -> Result<Map<String, Value>, TokenDecodeError> {
    let bytes = decode_segment(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode token segment");
        e
    })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(TokenDecodeError::Encoding(format!(
            "{name} is not a JSON object"
        ))),
        Err(e) => {
            tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to parse token segment JSON");
            Err(TokenDecodeError::Encoding(format!(
                "{name} is not valid JSON: {e}"
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

    fn segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    fn token_with_header(header: &str) -> String {
        format!(
            "{}.{}.{}",
            segment(header),
            segment(r#"{"sub":"user-1"}"#),
            URL_SAFE_NO_PAD.encode(b"sig")
        )
    }

    #[test]
    fn test_decode_valid_token() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"key-1"}"#);

        let decoded = decode_token(&token).unwrap();

        assert_eq!(decoded.header.kid(), Some("key-1"));
        assert_eq!(decoded.header.alg(), Some("RS256"));
        assert_eq!(decoded.payload.get("sub").unwrap(), "user-1");
        assert_eq!(decoded.signature, b"sig");
    }

    #[test]
    fn test_signing_input_is_original_encoded_text() {
        let token = token_with_header(r#"{"alg":"RS256","kid":"key-1"}"#);
        let decoded = decode_token(&token).unwrap();

        let expected = token.rsplit_once('.').unwrap().0;
        assert_eq!(decoded.signing_input(), expected.as_bytes());
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        for token in ["", "single", "only.two", "a.b.c.d", "a.b.c.d.e"] {
            assert!(
                matches!(decode_token(token), Err(TokenDecodeError::Malformed(_))),
                "expected Malformed for {token:?}"
            );
        }
    }

    #[test]
    fn test_oversized_token_is_malformed() {
        let token = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert!(matches!(
            decode_token(&token),
            Err(TokenDecodeError::Malformed(msg)) if msg.contains("exceeds")
        ));
    }

    #[test]
    fn test_invalid_base64_header_is_encoding_error() {
        let token = format!("!!!.{}.sig", segment("{}"));
        assert!(matches!(
            decode_token(&token),
            Err(TokenDecodeError::Encoding(_))
        ));
    }

    #[test]
    fn test_non_json_payload_is_encoding_error() {
        let token = format!("{}.{}.sig", segment(r#"{"kid":"k"}"#), segment("not json"));
        assert!(matches!(
            decode_token(&token),
            Err(TokenDecodeError::Encoding(msg)) if msg.contains("payload")
        ));
    }

    #[test]
    fn test_json_array_header_is_encoding_error() {
        let token = format!("{}.{}.sig", segment("[1,2]"), segment("{}"));
        assert!(matches!(
            decode_token(&token),
            Err(TokenDecodeError::Encoding(msg)) if msg.contains("header")
        ));
    }

    #[test]
    fn test_padded_segments_are_accepted() {
        // 17-byte JSON needs padding in standard base64
        let header = URL_SAFE.encode(br#"{"kid":"padded1"}"#);
        assert!(header.ends_with('='));
        let token = format!("{}.{}.{}", header, URL_SAFE.encode(b"{}"), URL_SAFE.encode(b"s"));

        let decoded = decode_token(&token).unwrap();
        assert_eq!(decoded.header.kid(), Some("padded1"));
    }

    #[test]
    fn test_missing_or_empty_kid_is_absent() {
        for header in [
            r#"{"alg":"RS256"}"#,
            r#"{"alg":"RS256","kid":""}"#,
            r#"{"alg":"RS256","kid":12345}"#,
            r#"{"alg":"RS256","kid":null}"#,
        ] {
            let token = token_with_header(header);
            let decoded = decode_token(&token).unwrap();
            assert!(decoded.header.kid().is_none(), "kid should be absent for {header}");
        }
    }

    #[test]
    fn test_decode_segment_rejects_standard_alphabet() {
        assert!(decode_segment("ab+/").is_err());
        assert_eq!(decode_segment("AQAB").unwrap(), vec![1, 0, 1]);
    }
}
