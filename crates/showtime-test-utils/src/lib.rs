//! # Showtimes Test Utilities
//!
//! Shared test utilities for the Showtimes API.
//!
//! - `crypto_fixtures` - fixed RSA keypairs, RS256 token signing, JWK export
//! - `token_builders` - fluent claims builder
//! - `server_harness` - `TestShowtimeServer` backed by a mock identity provider
//!
//! ## Usage
//!
//! ```rust,ignore
//! use showtime_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestShowtimeServer::spawn().await?;
//!     let token = server.keypair().sign(&server.claims().build());
//!
//!     let response = reqwest::Client::new()
//!         .get(format!("{}/api/me", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

pub use crypto_fixtures::TestKeypair;
pub use server_harness::TestShowtimeServer;
pub use token_builders::TestClaimsBuilder;
