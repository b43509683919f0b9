//! Freshness contracts for cache reads.
//!
//! Callers state how old a cached value may be; reads come back wrapped in
//! [`CacheRead`] so the age of the data stays visible.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// How a lookup may use the cache tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Accept cached data written no longer than `max_age` ago.
    MaxAge {
        /// Maximum acceptable age for disk entries.
        max_age: Duration,
    },

    /// Skip both cache tiers and go to the network, but still populate
    /// the caches with the result.
    Refresh,
}

impl Freshness {
    pub fn max_age(max_age: Duration) -> Self {
        Self::MaxAge { max_age }
    }

    /// Pick `Refresh` when `force_refresh` is set, otherwise `MaxAge(ttl)`.
    pub fn from_flag(force_refresh: bool, ttl: Duration) -> Self {
        if force_refresh {
            Self::Refresh
        } else {
            Self::MaxAge { max_age: ttl }
        }
    }

    pub fn is_refresh(&self) -> bool {
        matches!(self, Self::Refresh)
    }
}

/// True when a value written at `cached_at` is still usable at `now`.
///
/// An entry is fresh while `now - cached_at <= ttl`. Entries stamped in the
/// future (clock skew) are treated as fresh.
pub fn is_fresh(cached_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match (now - cached_at).to_std() {
        Ok(age) => age <= ttl,
        Err(_) => true,
    }
}

/// Result of a cache read, carrying when the value was written.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheRead<T> {
    pub fn new(value: T, cached_at: DateTime<Utc>) -> Self {
        Self { value, cached_at }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn cached_at(&self) -> DateTime<Utc> {
        self.cached_at
    }
}
