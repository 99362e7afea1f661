//! HTTP request handlers for the Showtimes API.

pub mod health;
pub mod me;
pub mod metrics;
pub mod movies;

pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
pub use movies::{get_movie, search_movies};
