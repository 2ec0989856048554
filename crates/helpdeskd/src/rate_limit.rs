//! Per-identity admission control.
//!
//! Continuous token bucket: every call refills the caller's bucket from
//! elapsed wall time, capped at the configured maximum, then tries to spend
//! one token. Refill is applied even when the request is denied, so a caller
//! that keeps hammering still accrues tokens at the steady rate. Buckets are
//! created lazily at full capacity and live for the life of the process.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default bucket size.
pub const DEFAULT_MAX_TOKENS: u32 = 10;
/// Default refill window: a full bucket regenerates over 10 minutes.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter keyed by request identity.
pub struct TokenBucketLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    max_tokens: f64,
    window: Duration,
}

impl TokenBucketLimiter {
    pub fn new(max_tokens: u32, window: Duration) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            max_tokens: f64::from(max_tokens.max(1)),
            window: window.max(Duration::from_secs(1)),
        }
    }

    /// Try to spend one token for `identity`. Returns whether the request
    /// is admitted. Bucket state is updated either way.
    pub fn consume(&self, identity: &str) -> bool {
        let now = Instant::now();
        let mut buckets = self.lock();
        let bucket = buckets.entry(identity.to_string()).or_insert(Bucket {
            tokens: self.max_tokens,
            last_refill: now,
        });
        Self::refill(bucket, now, self.max_tokens, self.window);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available for `identity`, after refill.
    pub fn remaining(&self, identity: &str) -> f64 {
        let now = Instant::now();
        let mut buckets = self.lock();
        match buckets.get_mut(identity) {
            Some(bucket) => {
                Self::refill(bucket, now, self.max_tokens, self.window);
                bucket.tokens
            }
            None => self.max_tokens,
        }
    }

    /// Seconds until `identity` next has a whole token, rounded up.
    pub fn retry_after_secs(&self, identity: &str) -> u64 {
        let tokens = self.remaining(identity);
        if tokens >= 1.0 {
            return 0;
        }
        let per_token_secs = self.window.as_secs_f64() / self.max_tokens;
        ((1.0 - tokens) * per_token_secs).ceil() as u64
    }

    fn refill(bucket: &mut Bucket, now: Instant, max_tokens: f64, window: Duration) {
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        let gained = elapsed * (max_tokens / window.as_secs_f64());
        bucket.tokens = (bucket.tokens + gained).min(max_tokens);
        bucket.last_refill = now;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Bucket>> {
        match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for TokenBucketLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOKENS, DEFAULT_WINDOW)
    }
}
