//! Fixed RSA keypairs for signing test tokens.
//!
//! Key generation is slow, so two 2048-bit keys are checked in under
//! `fixtures/`. Their public moduli are embedded below so JWKs can be built
//! without parsing the private keys.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey};
use serde_json::{json, Value};

const PRIMARY_PEM: &str = include_str!("../fixtures/test_rsa_primary.pem");
const SECONDARY_PEM: &str = include_str!("../fixtures/test_rsa_secondary.pem");

const PRIMARY_MODULUS: &str = "rS5FyPDoiafPhRDmO0zFJobxA3bE3L9qQVPCFkEnBcYvrmRcUKirz1ACQKRl0yZz2JYb3JBQSAmriLSPJs4XyegcYwE1aLGnVv23y4rRL5b0zkP5gFfSrBEsmmX0UZfcpDzT7sN82Q76dcVIMJIkTDvZXFtk1QmmfQHeeZpsBZ697YREwWvvAnImTYSaZU0SatFDzDYefGysKFo96pd5xi6i4V8dsamTkpP2PtzBtAAhGT6PPNV31ndhew916egu3JgiA00j9lTD8WOsRJpui77oterMcMpRpLTN4A0G6PYeYerblY8CAW3YNBL1_yJl0rOxBT1G4kpqRnkEKw9xjQ";
const SECONDARY_MODULUS: &str = "vITs7p-7uDwMAzMY1K5L3AWhybIUWKJExzyLdnsjPAa0WMKuZ5rf4mXtQ4pxyzYP6hZupSPDKaedhO7O5WxnTJEK5P1_oBlOpy71N9gZjBH7kVzc0_RBgRL8jEY_K_EkjwQKn6DTUiML4S3EDvapokiX0YQmcux7J1Jpj2JdPyxqfPjLOl7F0ibU5SlI-RXldfl_noBlLoCA_MLBKSV4TRykPSlxFecfh3a6MbXhRcm9YvNVIVP085rtGrKMOvFTtxN95YfnuJYMFrBV2mBShPJW9YMbuZkf42lGEZ9I583aOgtEnbZ1fh9B1Ze3RlpcKT6qghQ0TBu1UdIwkuRGPQ";
const PUBLIC_EXPONENT: &str = "AQAB";

/// An RSA signing key with the `kid` it is published under.
#[derive(Clone)]
pub struct TestKeypair {
    kid: String,
    private_pem: &'static str,
    modulus: &'static str,
}

impl TestKeypair {
    /// The primary fixture key, published under `kid`.
    pub fn primary(kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            private_pem: PRIMARY_PEM,
            modulus: PRIMARY_MODULUS,
        }
    }

    /// A second, unrelated key. Use it to forge signatures under a known `kid`.
    pub fn secondary(kid: &str) -> Self {
        Self {
            kid: kid.to_string(),
            private_pem: SECONDARY_PEM,
            modulus: SECONDARY_MODULUS,
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Sign `claims` as an RS256 JWT with this key's `kid` in the header.
    pub fn sign(&self, claims: &Value) -> String {
        self.sign_with_header(
            &json!({"alg": "RS256", "typ": "JWT", "kid": self.kid}),
            claims,
        )
    }

    /// Sign `claims` under an arbitrary header.
    ///
    /// The signature is always RS256 regardless of the declared `alg`, so
    /// tests can exercise algorithm and `kid` handling independently.
    pub fn sign_with_header(&self, header: &Value, claims: &Value) -> String {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        );
        let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes())
            .expect("fixture key must be a valid RSA PEM");
        let signature =
            jsonwebtoken::crypto::sign(signing_input.as_bytes(), &key, Algorithm::RS256)
                .expect("RS256 signing must succeed");

        format!("{}.{}", signing_input, signature)
    }

    /// The public key as a JWK, as an identity provider would publish it.
    pub fn jwk_json(&self) -> Value {
        json!({
            "kty": "RSA",
            "kid": self.kid,
            "use": "sig",
            "alg": "RS256",
            "n": self.modulus,
            "e": PUBLIC_EXPONENT,
        })
    }

    /// A key set containing only this key.
    pub fn jwks_json(&self) -> Value {
        json!({ "keys": [self.jwk_json()] })
    }
}
