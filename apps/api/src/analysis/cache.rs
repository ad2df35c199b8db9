//! Content-addressed, TTL-bounded memoization of analysis results.
//!
//! Keys are SHA-256 digests of the résumé text and job description, each prefixed
//! with its byte length so no pair can collide with another. Entries expire once
//! `now - inserted_at >= ttl` and are dropped on read. Capacity is bounded by LRU
//! eviction so the cache cannot grow without limit.
//!
//! The map lock is held only for the map operation itself, never across an await,
//! so unrelated requests never serialize on it.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::models::analysis::{AnalysisRequest, AnalysisResult};

/// Source of "now". Injected so tests can move time forward.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Content-addressed key for one résumé/JD pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &AnalysisRequest) -> Self {
        let mut hasher = Sha256::new();
        for part in [request.resume_text(), request.job_description()] {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part.as_bytes());
        }
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

struct CacheEntry {
    value: AnalysisResult,
    inserted_at: DateTime<Utc>,
}

pub struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: NonZeroUsize) -> Self {
        Self::with_clock(ttl, capacity, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, capacity: NonZeroUsize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            clock,
        }
    }

    /// Returns the cached result, or `None` when absent or expired.
    pub fn get(&self, key: &CacheKey) -> Option<AnalysisResult> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => self.is_expired(entry, now),
        };

        if expired {
            entries.pop(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn put(&self, key: CacheKey, value: AnalysisResult) {
        let entry = CacheEntry {
            value,
            inserted_at: self.clock.now(),
        };
        self.entries.lock().put(key, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        // A negative elapsed time (clock stepped backwards) counts as fresh.
        match (now - entry.inserted_at).to_std() {
            Ok(elapsed) => elapsed >= self.ttl,
            Err(_) => false,
        }
    }
}
