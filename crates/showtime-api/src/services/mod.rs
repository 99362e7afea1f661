//! Outbound service clients.

pub mod movie_client;

pub use movie_client::MovieClient;
