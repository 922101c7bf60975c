//! Per-client token bucket
//!
//! One token is refilled per whole elapsed second, capped at the limit.
//! Partial seconds are not credited and do not move the refill timestamp,
//! so a client polling every 900ms earns a token on the second poll.
//!
//! Each bucket is updated under its DashMap shard lock, which makes the
//! refill-then-consume step atomic for concurrent requests from one client.

use dashmap::DashMap;
use std::time::Instant;

/// Token state for one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBucket {
    /// Remaining tokens, never above the limit
    pub tokens: u32,
    /// Last time whole seconds were credited
    pub last_refill: Instant,
}

impl RateBucket {
    /// Full bucket
    #[inline]
    #[must_use]
    pub fn full(limit: u32, now: Instant) -> Self {
        Self {
            tokens: limit,
            last_refill: now,
        }
    }

    /// Credit whole elapsed seconds, then try to take one token
    pub fn try_consume(&mut self, limit: u32, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs();
        if elapsed >= 1 {
            let credit = u32::try_from(elapsed).unwrap_or(u32::MAX);
            self.tokens = self.tokens.saturating_add(credit).min(limit);
            self.last_refill = now;
        }

        if self.tokens >= 1 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }
}

/// Token-bucket rate limiter keyed by client id
///
/// Buckets are created lazily and live as long as the limiter.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    buckets: DashMap<String, RateBucket>,
}

impl RateLimiter {
    /// Create limiter with `limit` tokens per client
    #[inline]
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            buckets: DashMap::new(),
        }
    }

    /// Configured limit
    #[inline]
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Admit or refuse one request from `client_id`
    #[inline]
    pub fn admit(&self, client_id: &str) -> bool {
        self.admit_at(client_id, Instant::now())
    }

    /// [`RateLimiter::admit`] against an explicit clock
    pub fn admit_at(&self, client_id: &str, now: Instant) -> bool {
        let limit = self.limit;
        let mut bucket = self
            .buckets
            .entry(client_id.to_string())
            .or_insert_with(|| RateBucket::full(limit, now));
        bucket.try_consume(limit, now)
    }

    /// Snapshot of a client's bucket
    #[must_use]
    pub fn bucket(&self, client_id: &str) -> Option<RateBucket> {
        self.buckets.get(client_id).map(|b| *b)
    }

    /// Number of clients seen
    #[inline]
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn limit_th_admitted_next_refused() {
        let limiter = RateLimiter::new(3);
        let now = Instant::now();
        assert!(limiter.admit_at("c", now));
        assert!(limiter.admit_at("c", now));
        assert!(limiter.admit_at("c", now));
        assert!(!limiter.admit_at("c", now));
    }

    #[test]
    fn zero_limit_always_refuses() {
        let limiter = RateLimiter::new(0);
        let t0 = Instant::now();
        assert!(!limiter.admit_at("c", t0));
        assert!(!limiter.admit_at("c", t0 + Duration::from_secs(3600)));
    }

    #[test]
    fn clients_are_independent() {
        let limiter = RateLimiter::new(1);
        let now = Instant::now();
        assert!(limiter.admit_at("a", now));
        assert!(!limiter.admit_at("a", now));
        assert!(limiter.admit_at("b", now));
        assert_eq!(limiter.client_count(), 2);
    }

    #[test]
    fn refills_one_token_per_whole_second() {
        let limiter = RateLimiter::new(2);
        let t0 = Instant::now();
        assert!(limiter.admit_at("c", t0));
        assert!(limiter.admit_at("c", t0));
        assert!(!limiter.admit_at("c", t0 + Duration::from_millis(999)));
        assert!(limiter.admit_at("c", t0 + Duration::from_millis(1000)));
        assert!(!limiter.admit_at("c", t0 + Duration::from_millis(1000)));
    }

    #[test]
    fn partial_seconds_do_not_reset_timer() {
        let limiter = RateLimiter::new(1);
        let t0 = Instant::now();
        assert!(limiter.admit_at("c", t0));
        assert!(!limiter.admit_at("c", t0 + Duration::from_millis(600)));
        assert_eq!(limiter.bucket("c").map(|b| b.last_refill), Some(t0));
        assert!(limiter.admit_at("c", t0 + Duration::from_millis(1200)));
    }

    #[test]
    fn refill_is_capped() {
        let limiter = RateLimiter::new(2);
        let t0 = Instant::now();
        assert!(limiter.admit_at("c", t0));
        let later = t0 + Duration::from_secs(3600);
        assert!(limiter.admit_at("c", later));
        assert_eq!(limiter.bucket("c").map(|b| b.tokens), Some(1));
    }

    #[test]
    fn concurrent_admission_never_over_admits() {
        let limiter = Arc::new(RateLimiter::new(50));
        let now = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || (0..20).filter(|_| limiter.admit_at("c", now)).count())
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }

    proptest! {
        #[test]
        fn prop_burst_within_one_second(limit in 1u32..50) {
            let limiter = RateLimiter::new(limit);
            let now = Instant::now();
            for _ in 0..limit {
                prop_assert!(limiter.admit_at("c", now));
            }
            prop_assert!(!limiter.admit_at("c", now));
        }

        #[test]
        fn prop_tokens_never_exceed_limit(limit in 0u32..20, gaps in proptest::collection::vec(0u64..5_000, 1..30)) {
            let limiter = RateLimiter::new(limit);
            let mut now = Instant::now();
            for gap in gaps {
                now += Duration::from_millis(gap);
                limiter.admit_at("c", now);
                let bucket = limiter.bucket("c").unwrap();
                prop_assert!(bucket.tokens <= limit);
            }
        }
    }
}
