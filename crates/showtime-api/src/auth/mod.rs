//! Bearer token authentication.
//!
//! - `jwks` - issuer key-set fetching and caching
//! - `verifier` - RS256 signature verification
//! - `claims` - expiry, audience and issuer checks
//! - `authorizer` - the per-request pipeline composing the above

pub mod authorizer;
pub mod claims;
pub mod jwks;
pub mod verifier;

pub use authorizer::RequestAuthorizer;
pub use claims::Claims;
pub use jwks::KeySetCache;
