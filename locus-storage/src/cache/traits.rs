//! Cache backend traits and statistics.

use async_trait::async_trait;
use locus_core::{Chromosome, Interval};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;

use super::entry_key::{DataType, EntryKey};
use super::freshness::CacheRead;

/// Marker trait for values that can live in either cache tier.
pub trait CachePayload: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> CachePayload for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Durable key to document store with TTL expiry.
///
/// Cache writes are best-effort: implementations log and swallow I/O and
/// serialization failures instead of returning them, and unreadable entries
/// read as absent. Writes to the same key may race; the last write wins.
#[async_trait]
pub trait KeyedStore: Send + Sync {
    /// Return the payload if present and no older than `ttl`.
    ///
    /// Expired entries are deleted as a side effect.
    async fn get<T: CachePayload>(
        &self,
        data_type: &DataType,
        key: &str,
        ttl: Duration,
    ) -> Option<CacheRead<T>>;

    /// Write `payload` stamped with the current time, replacing any prior
    /// entry. Returns whether the write reached disk.
    async fn put<T: CachePayload>(&self, data_type: &DataType, key: &str, payload: &T) -> bool;

    /// Remove every entry of a data type. Returns the number removed.
    async fn clear(&self, data_type: &DataType) -> u64;

    /// Find a fresh range entry whose interval contains `interval` on the
    /// same chromosome and variant.
    async fn find_containing<T: CachePayload>(
        &self,
        data_type: &DataType,
        chrom: &Chromosome,
        interval: Interval,
        variant: Option<&str>,
        ttl: Duration,
    ) -> Option<(EntryKey, CacheRead<T>)>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by either cache tier.
    pub hits: u64,
    /// Lookups that had to go to the network.
    pub misses: u64,
    /// Network calls issued.
    pub network_calls: u64,
    /// Network calls that failed.
    pub failures: u64,
    /// Lookups refused because their region exhausted the retry budget.
    pub short_circuits: u64,
    /// Range partitions trimmed for size.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
