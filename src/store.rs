// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory key/value store with per-key expiry.
//!
//! Reads never refresh an entry's expiry. An expired entry is invisible to
//! every read as soon as its deadline passes, whether or not
//! [`ExpiringStore::purge_expired`] has dropped it yet.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    /// `None` never expires
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }

    fn remaining(&self, now: Instant) -> Duration {
        self.expires_at
            .map_or(Duration::MAX, |deadline| deadline.saturating_duration_since(now))
    }
}

/// Thread-safe string-keyed store with optional TTL per entry.
#[derive(Debug)]
pub struct ExpiringStore<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V: Clone> Default for ExpiringStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> ExpiringStore<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Store `value` under `key`, expiring `ttl` from now. Replaces any
    /// previous value and expiry.
    pub async fn put_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        // An unrepresentable deadline is as good as none.
        let expires_at = Instant::now().checked_add(ttl);
        self.insert(key.into(), value, expires_at).await;
    }

    /// Store `value` under `key` with no expiry.
    pub async fn put(&self, key: impl Into<String>, value: V) {
        self.insert(key.into(), value, None).await;
    }

    async fn insert(&self, key: String, value: V, expires_at: Option<Instant>) {
        let mut entries = self.entries.write().await;
        entries.insert(key, Entry { value, expires_at });
    }

    /// Current value for `key`, if set and not expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Current value and time left before it expires. Entries stored
    /// without a TTL report [`Duration::MAX`].
    pub async fn get_with_ttl(&self, key: &str) -> Option<(V, Duration)> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| (entry.value.clone(), entry.remaining(now)))
    }

    /// Delete `key`. Removing a missing key is a no-op.
    pub async fn remove(&self, key: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(key);
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries.values().filter(|entry| entry.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop expired entries (should be called periodically). Returns how
    /// many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let store = ExpiringStore::new();
        store.put_with_ttl("0xabc", true, Duration::from_secs(60)).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(store.get("0xabc").await, Some(true));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("0xabc").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_do_not_extend_ttl() {
        let store = ExpiringStore::new();
        store.put_with_ttl("10.0.0.1", (), Duration::from_secs(30)).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        let (_, first) = store.get_with_ttl("10.0.0.1").await.unwrap();
        for _ in 0..10 {
            let _ = store.get("10.0.0.1").await;
        }
        let (_, after) = store.get_with_ttl("10.0.0.1").await.unwrap();

        assert_eq!(first, Duration::from_secs(20));
        assert_eq!(after, first);

        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(store.get("10.0.0.1").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_value_and_expiry() {
        let store = ExpiringStore::new();
        store.put_with_ttl("key", 1u64, Duration::from_secs(5)).await;
        store.put("key", 2u64).await;

        tokio::time::advance(Duration::from_secs(3600)).await;
        let (value, remaining) = store.get_with_ttl("key").await.unwrap();
        assert_eq!(value, 2);
        assert_eq!(remaining, Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_already_expired() {
        let store = ExpiringStore::new();
        store.put_with_ttl("key", (), Duration::ZERO).await;
        assert!(store.get("key").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = ExpiringStore::new();
        store.put("key", ()).await;
        store.remove("key").await;
        store.remove("key").await;
        store.remove("never-set").await;
        assert!(store.get("key").await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_live_entries() {
        let store = ExpiringStore::new();
        store.put_with_ttl("short", (), Duration::from_secs(1)).await;
        store.put_with_ttl("long", (), Duration::from_secs(100)).await;
        store.put("forever", ()).await;

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 2);
    }
}
