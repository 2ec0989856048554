//! Bounded TTL response cache keyed by request fingerprint.
//!
//! Access-ordered via the `lru` crate: a hit bumps the entry to
//! most-recently-used, an insert at capacity evicts the coldest entry.
//! Expiry is lazy — entries past the TTL are only removed when read, so
//! `len()` may transiently count expired-but-unread entries.

use helpdesk_common::Answer;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Default number of cached answers.
pub const DEFAULT_CAPACITY: usize = 100;
/// Default time-to-live for a cached answer.
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    answer: Answer,
    inserted_at: Instant,
}

/// Shared answer cache. One mapping-wide lock is enough at this capacity.
pub struct AnswerCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl AnswerCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Look up a fingerprint. A hit refreshes recency; an expired entry is
    /// removed and reported as absent.
    pub async fn get(&self, key: &str) -> Option<Answer> {
        let mut cache = self.inner.lock().await;
        let expired = match cache.peek(key) {
            None => return None,
            Some(entry) => entry.inserted_at.elapsed() > self.ttl,
        };
        if expired {
            debug!("cache entry expired: {}", short_key(key));
            cache.pop(key);
            return None;
        }
        cache.get(key).map(|entry| entry.answer.clone())
    }

    /// Insert an answer with a fresh timestamp. Re-inserting an existing key
    /// replaces it and resets recency; at capacity the least-recently-used
    /// entry is evicted first.
    pub async fn set(&self, key: &str, answer: Answer) {
        let mut cache = self.inner.lock().await;
        cache.put(
            key.to_string(),
            CacheEntry {
                answer,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Current entry count, expired-but-unread entries included.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

impl Default for AnswerCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

fn short_key(key: &str) -> String {
    key.chars().take(24).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use helpdesk_common::{Citation, Step};

    fn answer(title: &str) -> Answer {
        Answer {
            answer_title: title.to_string(),
            one_paragraph_summary: "Summary.".to_string(),
            prereqs: vec![],
            steps: vec![Step {
                title: "Step".to_string(),
                detail: "Detail.".to_string(),
                os: vec![helpdesk_common::Os::Linux],
                est_minutes: None,
                shell: vec![],
            }],
            decision_tree: vec![],
            diagrams: vec![],
            citations: vec![
                Citation {
                    url: "https://example.com".to_string(),
                    title: "A".to_string(),
                    quote: String::new(),
                },
                Citation {
                    url: "https://other.org".to_string(),
                    title: "B".to_string(),
                    quote: String::new(),
                },
            ],
            warnings: vec![],
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = AnswerCache::default();
        assert!(cache.get("k").await.is_none());
        cache.set("k", answer("t")).await;
        assert_eq!(cache.get("k").await.unwrap().answer_title, "t");
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let cache = AnswerCache::new(3, DEFAULT_TTL);
        cache.set("a", answer("a")).await;
        cache.set("b", answer("b")).await;
        cache.set("c", answer("c")).await;
        // touch "a" so "b" becomes the coldest entry
        assert!(cache.get("a").await.is_some());
        cache.set("d", answer("d")).await;
        assert_eq!(cache.len().await, 3);
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("a").await.is_some());
        assert!(cache.get("d").await.is_some());
    }

    #[tokio::test]
    async fn test_capacity_plus_one_inserts_leave_capacity_entries() {
        let cache = AnswerCache::new(4, DEFAULT_TTL);
        for i in 0..5 {
            cache.set(&format!("k{}", i), answer("t")).await;
        }
        assert_eq!(cache.len().await, 4);
        // k0 was the least-recently-touched key
        assert!(cache.get("k0").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_removed_on_read() {
        let cache = AnswerCache::new(10, Duration::from_millis(30));
        cache.set("k", answer("t")).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(cache.len().await, 1, "expiry is lazy until read");
        assert!(cache.get("k").await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_reinsert_resets_recency_without_duplicating() {
        let cache = AnswerCache::new(2, DEFAULT_TTL);
        cache.set("a", answer("a1")).await;
        cache.set("b", answer("b")).await;
        cache.set("a", answer("a2")).await;
        assert_eq!(cache.len().await, 2);
        // "b" is now coldest; inserting "c" evicts it, not "a"
        cache.set("c", answer("c")).await;
        assert!(cache.get("b").await.is_none());
        assert_eq!(cache.get("a").await.unwrap().answer_title, "a2");
    }
}
