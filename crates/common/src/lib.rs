//! Common utilities and types shared across Showtimes components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for signed token decoding (segment splitting, base64url, header/payload parsing)
pub mod jwt;
