//! Observability for the Showtimes API.
//!
//! - `metrics` - Prometheus metric definitions recorded through the `metrics` facade

pub mod metrics;
