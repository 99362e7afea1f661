//! Per-client fixed-window rate limiting of authentication attempts.
//!
//! Each client identifier gets a counter and a window start. A call is
//! admitted while the counter is below the limit; the first call after the
//! window has elapsed starts a fresh window.
//!
//! Records are swept opportunistically: a small random fraction of calls
//! removes every record whose window started more than two window lengths
//! ago. State is per process; separate instances do not share counters.

use axum::http::HeaderMap;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Fraction of calls that trigger a sweep of idle records.
pub const DEFAULT_CLEANUP_PROBABILITY: f64 = 0.01;

/// Bucket used when the request carries no client address.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy)]
struct RateLimitRecord {
    count: u32,
    window_start: Instant,
}

/// Fixed-window rate limiter keyed by client identifier.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    cleanup_probability: f64,
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` calls per `window` per client.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            cleanup_probability: DEFAULT_CLEANUP_PROBABILITY,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Override the sweep sampling probability (0.0 disables sweeping).
    pub fn with_cleanup_probability(mut self, probability: f64) -> Self {
        self.cleanup_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Seconds a rejected client should wait (one window length).
    pub fn retry_after_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    /// Record a call from `client_id` and report whether it is admitted.
    pub fn allow(&self, client_id: &str) -> bool {
        let now = Instant::now();

        if self.cleanup_probability > 0.0 && rand::random::<f64>() < self.cleanup_probability {
            self.sweep(now);
        }

        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        match records.get_mut(client_id) {
            Some(record) if now.duration_since(record.window_start) < self.window => {
                if record.count < self.limit {
                    record.count += 1;
                    true
                } else {
                    tracing::debug!(
                        target: "showtime.rate_limit",
                        count = record.count,
                        limit = self.limit,
                        "Client over limit"
                    );
                    false
                }
            }
            _ => {
                records.insert(
                    client_id.to_string(),
                    RateLimitRecord {
                        count: 1,
                        window_start: now,
                    },
                );
                true
            }
        }
    }

    /// Remove records whose window started more than two windows before `now`.
    ///
    /// Returns the number of records removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let idle_after = self.window.saturating_mul(2);
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|_, record| now.duration_since(record.window_start) <= idle_after);
        let removed = before - records.len();

        if removed > 0 {
            tracing::debug!(target: "showtime.rate_limit", removed, "Swept idle rate limit records");
        }
        removed
    }

    /// Number of client identifiers currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Derive the rate limit key from the trusted client-address header.
///
/// A comma-separated forwarding chain is reduced to its first entry. Missing
/// or empty values fall back to the shared [`UNKNOWN_CLIENT`] bucket.
pub fn client_identifier(headers: &HeaderMap, header_name: &str) -> String {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
