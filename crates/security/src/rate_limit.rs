//! Token-bucket rate limiting keyed by principal and endpoint.

use ddrgate_config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Buckets beyond this count trigger eviction of full (idle) buckets.
const EVICTION_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    updated: Instant,
}

/// In-memory token buckets. Thread-safe via `std::sync::Mutex` (held briefly).
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: Mutex<HashMap<(String, String), Bucket>>,
}

impl RateLimiter {
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            capacity: f64::from(capacity),
            refill_per_sec,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.capacity, config.refill_per_sec)
    }

    /// Take one token for `(principal, endpoint)`. Returns `true` if allowed.
    pub fn check(&self, principal: &str, endpoint: &str) -> bool {
        self.check_at(principal, endpoint, Instant::now())
    }

    /// As [`check`](Self::check), with an explicit clock reading.
    pub fn check_at(&self, principal: &str, endpoint: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        if buckets.len() > EVICTION_THRESHOLD {
            let (capacity, refill) = (self.capacity, self.refill_per_sec);
            buckets.retain(|_, bucket| refill_level(bucket, now, capacity, refill) < capacity);
        }

        let bucket = buckets
            .entry((principal.to_string(), endpoint.to_string()))
            .or_insert(Bucket {
                tokens: self.capacity,
                updated: now,
            });

        bucket.tokens = refill_level(bucket, now, self.capacity, self.refill_per_sec);
        bucket.updated = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

fn refill_level(bucket: &Bucket, now: Instant, capacity: f64, refill_per_sec: f64) -> f64 {
    let elapsed = now.saturating_duration_since(bucket.updated).as_secs_f64();
    (bucket.tokens + elapsed * refill_per_sec).min(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn burst_up_to_capacity_then_denied() {
        let limiter = RateLimiter::new(3, 1.0);
        let t0 = Instant::now();
        assert!(limiter.check_at("ci", "/api/v1/evaluate", t0));
        assert!(limiter.check_at("ci", "/api/v1/evaluate", t0));
        assert!(limiter.check_at("ci", "/api/v1/evaluate", t0));
        assert!(!limiter.check_at("ci", "/api/v1/evaluate", t0));
    }

    #[test]
    fn tokens_refill_over_time() {
        let limiter = RateLimiter::new(1, 2.0);
        let t0 = Instant::now();
        assert!(limiter.check_at("ci", "/x", t0));
        assert!(!limiter.check_at("ci", "/x", t0 + Duration::from_millis(100)));
        assert!(limiter.check_at("ci", "/x", t0 + Duration::from_millis(600)));
    }

    #[test]
    fn buckets_are_per_principal_and_endpoint() {
        let limiter = RateLimiter::new(1, 0.001);
        let t0 = Instant::now();
        assert!(limiter.check_at("ci", "/a", t0));
        assert!(!limiter.check_at("ci", "/a", t0));
        assert!(limiter.check_at("ci", "/b", t0));
        assert!(limiter.check_at("author", "/a", t0));
    }

    #[test]
    fn refill_never_exceeds_capacity() {
        let limiter = RateLimiter::new(2, 100.0);
        let t0 = Instant::now();
        assert!(limiter.check_at("ci", "/x", t0));
        let later = t0 + Duration::from_secs(60);
        assert!(limiter.check_at("ci", "/x", later));
        assert!(limiter.check_at("ci", "/x", later));
        assert!(!limiter.check_at("ci", "/x", later));
    }

    #[test]
    fn from_config_uses_capacity() {
        let limiter = RateLimiter::from_config(&RateLimitConfig {
            capacity: 1,
            refill_per_sec: 1.0,
        });
        let t0 = Instant::now();
        assert!(limiter.check_at("p", "/x", t0));
        assert!(!limiter.check_at("p", "/x", t0));
    }
}
