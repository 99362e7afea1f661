//! RS256 signature verification against a key set.
//!
//! The signature is checked over the exact encoded `header.payload` text of
//! the token, never over re-serialized JSON.

use crate::auth::jwks::{Jwk, KeySet};
use crate::errors::ApiError;
use common::jwt::{decode_segment, TokenHeader};
use ring::signature::{RsaPublicKeyComponents, RSA_PKCS1_2048_8192_SHA256};

/// The only accepted signature algorithm.
pub const EXPECTED_ALGORITHM: &str = "RS256";

/// Resolve the signing key named by `header.kid`.
///
/// # Errors
///
/// Returns `ApiError::UnknownKey` when the header has no `kid` or the key set
/// has no key with that id.
pub fn resolve_key<'k>(header: &TokenHeader, key_set: &'k KeySet) -> Result<&'k Jwk, ApiError> {
    let kid = header
        .kid()
        .ok_or_else(|| ApiError::UnknownKey("token header has no kid".to_string()))?;

    key_set
        .find(kid)
        .ok_or_else(|| ApiError::UnknownKey(format!("kid '{}' is not in the key set", kid)))
}

/// Verify a token signature.
///
/// Returns `Ok(false)` when the key is valid but the signature does not
/// match; the caller maps that to `InvalidSignature`.
///
/// # Errors
///
/// - `UnknownKey` - see [`resolve_key`]
/// - `InvalidSignature` - the token declares an algorithm other than RS256,
///   or the matched key cannot be imported as an RSA public key
pub fn verify_signature(
    header: &TokenHeader,
    signing_input: &[u8],
    signature: &[u8],
    key_set: &KeySet,
) -> Result<bool, ApiError> {
    let jwk = resolve_key(header, key_set)?;

    if let Some(alg) = header.alg() {
        if alg != EXPECTED_ALGORITHM {
            return Err(ApiError::InvalidSignature(format!(
                "unsupported algorithm '{}'",
                alg
            )));
        }
    }

    let (n, e) = import_rsa_components(jwk)?;
    let public_key = RsaPublicKeyComponents { n: &n, e: &e };

    match public_key.verify(&RSA_PKCS1_2048_8192_SHA256, signing_input, signature) {
        Ok(()) => Ok(true),
        Err(_) => {
            tracing::debug!(target: "showtime.auth.verify", kid = %jwk.kid, "Signature mismatch");
            Ok(false)
        }
    }
}

fn import_rsa_components(jwk: &Jwk) -> Result<(Vec<u8>, Vec<u8>), ApiError> {
    if jwk.kty != "RSA" {
        return Err(ApiError::InvalidSignature(format!(
            "key '{}' has type '{}', expected RSA",
            jwk.kid, jwk.kty
        )));
    }

    let decode = |field: &Option<String>, name: &str| {
        let encoded = field.as_deref().ok_or_else(|| {
            ApiError::InvalidSignature(format!("key '{}' is missing '{}'", jwk.kid, name))
        })?;
        decode_segment(encoded).map_err(|e| {
            ApiError::InvalidSignature(format!("key '{}' has invalid '{}': {}", jwk.kid, name, e))
        })
    };

    Ok((decode(&jwk.n, "n")?, decode(&jwk.e, "e")?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::jwt::decode_token;
    use showtime_test_utils::crypto_fixtures::TestKeypair;

    fn key_set_of(keypairs: &[&TestKeypair]) -> KeySet {
        let keys: Vec<serde_json::Value> = keypairs.iter().map(|k| k.jwk_json()).collect();
        serde_json::from_value(serde_json::json!({ "keys": keys })).unwrap()
    }

    fn claims() -> serde_json::Value {
        serde_json::json!({"sub": "user-1", "exp": 4_102_444_800_i64})
    }

    #[test]
    fn test_valid_signature_verifies() {
        let keypair = TestKeypair::primary("key-1");
        let token = keypair.sign(&claims());
        let decoded = decode_token(&token).unwrap();

        let valid = verify_signature(
            &decoded.header,
            decoded.signing_input(),
            &decoded.signature,
            &key_set_of(&[&keypair]),
        )
        .unwrap();

        assert!(valid);
    }

    #[test]
    fn test_signature_from_other_key_with_same_kid_fails() {
        let signer = TestKeypair::secondary("key-1");
        let published = TestKeypair::primary("key-1");
        let token = signer.sign(&claims());
        let decoded = decode_token(&token).unwrap();

        let valid = verify_signature(
            &decoded.header,
            decoded.signing_input(),
            &decoded.signature,
            &key_set_of(&[&published]),
        )
        .unwrap();

        assert!(!valid);
    }

    #[test]
    fn test_tampered_payload_fails() {
        let keypair = TestKeypair::primary("key-1");
        let token = keypair.sign(&claims());
        let decoded = decode_token(&token).unwrap();

        let mut tampered = decoded.signing_input().to_vec();
        if let Some(last) = tampered.last_mut() {
            *last = if *last == b'A' { b'B' } else { b'A' };
        }

        let valid = verify_signature(
            &decoded.header,
            &tampered,
            &decoded.signature,
            &key_set_of(&[&keypair]),
        )
        .unwrap();

        assert!(!valid);
    }

    #[test]
    fn test_resolves_key_among_several() {
        let first = TestKeypair::secondary("key-old");
        let second = TestKeypair::primary("key-new");
        let token = second.sign(&claims());
        let decoded = decode_token(&token).unwrap();

        let valid = verify_signature(
            &decoded.header,
            decoded.signing_input(),
            &decoded.signature,
            &key_set_of(&[&first, &second]),
        )
        .unwrap();

        assert!(valid);
    }

    #[test]
    fn test_unknown_kid_is_unknown_key() {
        let keypair = TestKeypair::primary("key-1");
        let token = TestKeypair::primary("rotated-away").sign(&claims());
        let decoded = decode_token(&token).unwrap();

        let result = verify_signature(
            &decoded.header,
            decoded.signing_input(),
            &decoded.signature,
            &key_set_of(&[&keypair]),
        );

        assert!(matches!(result, Err(ApiError::UnknownKey(msg)) if msg.contains("rotated-away")));
    }

    #[test]
    fn test_non_rs256_algorithm_is_rejected() {
        let keypair = TestKeypair::primary("key-1");
        let token = keypair.sign_with_header(
            &serde_json::json!({"alg": "HS256", "typ": "JWT", "kid": "key-1"}),
            &claims(),
        );
        let decoded = decode_token(&token).unwrap();

        let result = verify_signature(
            &decoded.header,
            decoded.signing_input(),
            &decoded.signature,
            &key_set_of(&[&keypair]),
        );

        assert!(matches!(result, Err(ApiError::InvalidSignature(msg)) if msg.contains("HS256")));
    }

    #[test]
    fn test_non_rsa_key_is_rejected() {
        let key_set: KeySet = serde_json::from_value(serde_json::json!({
            "keys": [{"kty": "OKP", "kid": "key-1", "crv": "Ed25519", "x": "AAAA"}]
        }))
        .unwrap();
        let token = TestKeypair::primary("key-1").sign(&claims());
        let decoded = decode_token(&token).unwrap();

        let result = verify_signature(
            &decoded.header,
            decoded.signing_input(),
            &decoded.signature,
            &key_set,
        );

        assert!(matches!(result, Err(ApiError::InvalidSignature(msg)) if msg.contains("OKP")));
    }

    #[test]
    fn test_key_without_kty_is_rejected() {
        let keypair = TestKeypair::primary("key-1");
        let mut jwk = keypair.jwk_json();
        jwk.as_object_mut().unwrap().remove("kty");
        let key_set: KeySet =
            serde_json::from_value(serde_json::json!({ "keys": [jwk] })).unwrap();
        let token = keypair.sign(&claims());
        let decoded = decode_token(&token).unwrap();

        let result = verify_signature(
            &decoded.header,
            decoded.signing_input(),
            &decoded.signature,
            &key_set,
        );

        assert!(matches!(result, Err(ApiError::InvalidSignature(_))));
    }

    #[test]
    fn test_key_missing_modulus_is_rejected() {
        let key_set: KeySet = serde_json::from_value(serde_json::json!({
            "keys": [{"kty": "RSA", "kid": "key-1", "e": "AQAB"}]
        }))
        .unwrap();
        let token = TestKeypair::primary("key-1").sign(&claims());
        let decoded = decode_token(&token).unwrap();

        let result = verify_signature(
            &decoded.header,
            decoded.signing_input(),
            &decoded.signature,
            &key_set,
        );

        assert!(matches!(result, Err(ApiError::InvalidSignature(msg)) if msg.contains("'n'")));
    }
}
