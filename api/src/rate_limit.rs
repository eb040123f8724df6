//! Per-token sliding-window rate limiting over the mutating endpoints.
//!
//! State is a concurrent map from `(endpoint, token)` to the request
//! timestamps inside the active window. Cleanup is lazy per key: every
//! check prunes expired timestamps for the key it touches; there is no
//! global sweeper. Memory stays bounded by the number of distinct
//! tokens active within the window.
//!
//! The key is the extracted token value, not the raw header string,
//! so alternating header forms cannot stretch one token's quota.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Window length shared by all limited endpoints.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Endpoints subject to rate limiting. Metrics and health are not.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum LimitedEndpoint {
    Chat,
    Retrieve,
}

impl LimitedEndpoint {
    /// Maximum allowed requests per window.
    pub fn max_requests(self) -> usize {
        match self {
            LimitedEndpoint::Chat => 20,
            LimitedEndpoint::Retrieve => 60,
        }
    }
}

/// Outcome of one rate-limit check.
#[derive(Clone, Copy, Debug)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests left in the window after this one was admitted.
    pub remaining: usize,
    /// Whole seconds until the oldest in-window request expires;
    /// nonzero only on rejection.
    pub retry_after_secs: u64,
}

/// In-memory sliding-window table. Swap behind an interface before a
/// multi-instance deployment; the window math stays the same.
#[derive(Default)]
pub struct RateLimiter {
    table: DashMap<(LimitedEndpoint, String), Vec<Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks and, when allowed, records one request for the key.
    pub fn check(&self, endpoint: LimitedEndpoint, token: &str) -> RateDecision {
        self.check_at(endpoint, token, Instant::now())
    }

    fn check_at(&self, endpoint: LimitedEndpoint, token: &str, now: Instant) -> RateDecision {
        let max = endpoint.max_requests();
        let mut entry = self
            .table
            .entry((endpoint, token.to_string()))
            .or_default();

        entry.retain(|t| now.duration_since(*t) < WINDOW);

        if entry.len() >= max {
            let oldest = entry[0];
            let wait = WINDOW.saturating_sub(now.duration_since(oldest));
            let wait_ms = wait.as_millis() as u64;
            return RateDecision {
                allowed: false,
                remaining: 0,
                retry_after_secs: wait_ms.div_ceil(1000).max(1),
            };
        }

        entry.push(now);
        RateDecision {
            allowed: true,
            remaining: max - entry.len(),
            retry_after_secs: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_is_enforced_within_one_window() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..LimitedEndpoint::Chat.max_requests() {
            assert!(limiter.check_at(LimitedEndpoint::Chat, "tok", now).allowed);
        }
        let decision = limiter.check_at(LimitedEndpoint::Chat, "tok", now);
        assert!(!decision.allowed);
        assert!(decision.retry_after_secs > 0);
    }

    #[test]
    fn remaining_counts_down_from_max() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        let max = LimitedEndpoint::Retrieve.max_requests();

        for k in 1..=5 {
            let decision = limiter.check_at(LimitedEndpoint::Retrieve, "tok", now);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, max - k);
        }
    }

    #[test]
    fn tokens_are_isolated() {
        let limiter = RateLimiter::new();
        let now = Instant::now();
        let max = LimitedEndpoint::Chat.max_requests();

        for _ in 0..max {
            limiter.check_at(LimitedEndpoint::Chat, "greedy", now);
        }
        assert!(!limiter.check_at(LimitedEndpoint::Chat, "greedy", now).allowed);

        let other = limiter.check_at(LimitedEndpoint::Chat, "other", now);
        assert!(other.allowed);
        assert_eq!(other.remaining, max - 1);
    }

    #[test]
    fn endpoints_are_isolated_for_one_token() {
        let limiter = RateLimiter::new();
        let now = Instant::now();

        for _ in 0..LimitedEndpoint::Chat.max_requests() {
            limiter.check_at(LimitedEndpoint::Chat, "tok", now);
        }
        assert!(!limiter.check_at(LimitedEndpoint::Chat, "tok", now).allowed);
        assert!(limiter.check_at(LimitedEndpoint::Retrieve, "tok", now).allowed);
    }

    #[test]
    fn window_slides_and_quota_recovers() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for _ in 0..LimitedEndpoint::Chat.max_requests() {
            limiter.check_at(LimitedEndpoint::Chat, "tok", start);
        }
        assert!(!limiter.check_at(LimitedEndpoint::Chat, "tok", start).allowed);

        let later = start + WINDOW + Duration::from_millis(1);
        let decision = limiter.check_at(LimitedEndpoint::Chat, "tok", later);
        assert!(decision.allowed);
        assert_eq!(
            decision.remaining,
            LimitedEndpoint::Chat.max_requests() - 1
        );
    }

    #[test]
    fn retry_after_reflects_the_oldest_timestamp() {
        let limiter = RateLimiter::new();
        let start = Instant::now();

        for _ in 0..LimitedEndpoint::Chat.max_requests() {
            limiter.check_at(LimitedEndpoint::Chat, "tok", start);
        }
        let later = start + Duration::from_secs(30);
        let decision = limiter.check_at(LimitedEndpoint::Chat, "tok", later);
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after_secs, 30);
    }
}
