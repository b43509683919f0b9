//! Bounded in-memory tier for identifier-keyed lookups.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::freshness::is_fresh;

struct MemoEntry<T> {
    /// `None` records a confirmed "no data" answer.
    value: Option<T>,
    stored_at: DateTime<Utc>,
}

/// Memory tier in front of the keyed store for single-identifier services.
///
/// Holds at most `max_entries` answers; inserting past the limit drops the
/// oldest entry. Entries older than the TTL passed to [`MemoCache::get`] read
/// as absent.
pub struct MemoCache<T> {
    entries: Mutex<HashMap<String, MemoEntry<T>>>,
    max_entries: usize,
}

impl<T: Clone> MemoCache<T> {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Look up `key`. The outer `Option` is hit or miss; the inner one
    /// distinguishes a cached value from a cached empty answer.
    pub fn get(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> Option<Option<T>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = entries
            .get(key)
            .map(|entry| is_fresh(entry.stored_at, now, ttl))?;
        if !fresh {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: &str, value: Option<T>, stored_at: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(key.to_string(), MemoEntry { value, stored_at });
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl<T> std::fmt::Debug for MemoCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
