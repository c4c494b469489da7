//! Message and username caches
//!
//! Volatile lookups rebuilt from traffic:
//! - `MessageAuthorCache`: (chat, message) -> author, used to attribute reactions
//! - `UsernameCache`: lowercased @username -> user id, used to resolve targets
//!
//! Both are owned by the bot state and filled by the update pre-processing stage.

use hashlink::LinkedHashMap;
use moka::future::Cache;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Default number of messages remembered for reaction attribution
pub const DEFAULT_AUTHOR_CAPACITY: usize = 5000;

/// Default number of usernames remembered
pub const DEFAULT_USERNAME_CAPACITY: u64 = 10_000;

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: u64,
    pub hits: u64,
    pub misses: u64,
    pub evicted: u64,
}

/// Bounded (chat_id, message_id) -> author_id map, evicting oldest-first
pub struct MessageAuthorCache {
    entries: Mutex<LinkedHashMap<(i64, i32), i64>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evicted: AtomicU64,
}

impl MessageAuthorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LinkedHashMap::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remember who wrote a message. Re-recording a known message updates the
    /// author but keeps its place in eviction order.
    pub fn record(&self, chat_id: i64, message_id: i32, author_id: i64) {
        let mut entries = self.entries.lock();
        if let Some(slot) = entries.get_mut(&(chat_id, message_id)) {
            *slot = author_id;
            return;
        }
        entries.insert((chat_id, message_id), author_id);
        let removed = Self::evict_overflow(&mut entries, self.capacity);
        if removed > 0 {
            self.evicted.fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Author cache evicted {} oldest entries", removed);
        }
    }

    /// Author of a cached message
    pub fn author_of(&self, chat_id: i64, message_id: i32) -> Option<i64> {
        let found = self.entries.lock().get(&(chat_id, message_id)).copied();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Drop oldest entries until at most `capacity` remain. Returns how many went.
    pub fn evict_overflow(entries: &mut LinkedHashMap<(i64, i32), i64>, capacity: usize) -> usize {
        let mut removed = 0;
        while entries.len() > capacity {
            if entries.pop_front().is_none() {
                break;
            }
            removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len() as u64,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

impl Default for MessageAuthorCache {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHOR_CAPACITY)
    }
}

/// Lowercased username -> user id
#[derive(Clone)]
pub struct UsernameCache {
    cache: Cache<String, i64>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl UsernameCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Strip a leading `@` and lowercase
    pub fn normalize(username: &str) -> String {
        username.trim().trim_start_matches('@').to_lowercase()
    }

    pub async fn record(&self, username: &str, user_id: i64) {
        let key = Self::normalize(username);
        if key.is_empty() {
            return;
        }
        self.cache.insert(key, user_id).await;
    }

    /// Look up a username, with or without the leading `@`
    pub async fn lookup(&self, username: &str) -> Option<i64> {
        let key = Self::normalize(username);
        match self.cache.get(&key).await {
            Some(id) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(id)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Username not cached: {}", key);
                None
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.entry_count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evicted: 0,
        }
    }
}

impl Default for UsernameCache {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME_CAPACITY)
    }
}
