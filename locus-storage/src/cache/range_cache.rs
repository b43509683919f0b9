//! In-memory range cache.
//!
//! One [`RangeCache`] holds the samples of a single data type, split into
//! partitions (normally one per chromosome). Each partition keeps:
//!
//! - a sample map from position to value, and
//! - the sorted set of intervals that were fetched in full.
//!
//! A query is answered only when a single covered interval contains it.
//! Partial answers are never returned, even if every requested position
//! happens to be cached, because a covered interval may legitimately hold no
//! sample at a position and the two cases are indistinguishable otherwise.
//!
//! Every covered interval carries the time its oldest data was stored. A
//! query landing in an interval older than the caller's maximum age drops
//! that interval and its samples, and misses.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use locus_core::Interval;

use super::freshness::is_fresh;

/// Samples for one fully covered interval.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSlice<V> {
    interval: Interval,
    samples: BTreeMap<u64, V>,
}

impl<V> SampleSlice<V> {
    pub fn new(interval: Interval, samples: BTreeMap<u64, V>) -> Self {
        Self { interval, samples }
    }

    /// The interval this slice answers for.
    pub fn interval(&self) -> Interval {
        self.interval
    }

    /// Value at `position`; `None` means covered but no data.
    pub fn get(&self, position: u64) -> Option<&V> {
        self.samples.get(&position)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> {
        self.samples.iter().map(|(pos, value)| (*pos, value))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> BTreeMap<u64, V> {
        self.samples
    }
}

#[derive(Debug, Clone, Copy)]
struct Covered {
    interval: Interval,
    stored_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Partition<V> {
    /// Sorted; for consecutive intervals `a.end < b.start`.
    covered: Vec<Covered>,
    samples: BTreeMap<u64, V>,
}

impl<V> Default for Partition<V> {
    fn default() -> Self {
        Self {
            covered: Vec::new(),
            samples: BTreeMap::new(),
        }
    }
}

impl<V: Clone> Partition<V> {
    fn query(
        &mut self,
        interval: Interval,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Option<SampleSlice<V>> {
        let idx = self
            .covered
            .partition_point(|c| c.interval.start() <= interval.start());
        if idx == 0 {
            return None;
        }
        let covering = self.covered[idx - 1];
        if !covering.interval.contains(&interval) {
            return None;
        }
        if !is_fresh(covering.stored_at, now, max_age) {
            self.covered.remove(idx - 1);
            self.clear_samples(covering.interval);
            return None;
        }
        let samples = self
            .samples
            .range(interval.start()..interval.end())
            .map(|(pos, value)| (*pos, value.clone()))
            .collect();
        Some(SampleSlice::new(interval, samples))
    }

    fn clear_samples(&mut self, interval: Interval) {
        let stale: Vec<u64> = self
            .samples
            .range(interval.start()..interval.end())
            .map(|(pos, _)| *pos)
            .collect();
        for pos in stale {
            self.samples.remove(&pos);
        }
    }

    /// Merge `interval` into the covered set. The merged interval keeps the
    /// oldest timestamp of any absorbed data that `interval` did not replace.
    fn merge_covered(&mut self, interval: Interval, stored_at: DateTime<Utc>) {
        // First stored interval that ends at or after the new start: it either
        // overlaps, touches, or lies entirely to the right.
        let first = self
            .covered
            .partition_point(|c| c.interval.end() < interval.start());
        let mut merged = Covered {
            interval,
            stored_at,
        };
        let mut last = first;
        while last < self.covered.len()
            && self.covered[last].interval.start() <= merged.interval.end()
        {
            let absorbed = self.covered[last];
            if !interval.contains(&absorbed.interval) {
                merged.stored_at = merged.stored_at.min(absorbed.stored_at);
            }
            merged.interval = merged.interval.hull(&absorbed.interval);
            last += 1;
        }
        self.covered.splice(first..last, std::iter::once(merged));
    }

    /// Drop the lowest-positioned half of the samples and forget coverage.
    fn trim(&mut self) {
        let keep_from = self.samples.len() / 2;
        if let Some(pivot) = self.samples.keys().nth(keep_from).copied() {
            self.samples = self.samples.split_off(&pivot);
        }
        self.covered.clear();
    }
}

/// Outcome of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Samples stored and coverage merged.
    Stored,
    /// The partition exceeded its sample ceiling and was trimmed; its
    /// coverage is now empty.
    Trimmed,
}

/// Range-merging memory tier for one data type.
pub struct RangeCache<V> {
    partitions: RwLock<HashMap<String, Arc<Mutex<Partition<V>>>>>,
    max_samples_per_partition: usize,
}

impl<V: Clone> RangeCache<V> {
    pub fn new(max_samples_per_partition: usize) -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            max_samples_per_partition: max_samples_per_partition.max(1),
        }
    }

    fn partition(&self, key: &str) -> Option<Arc<Mutex<Partition<V>>>> {
        let partitions = self.partitions.read().unwrap_or_else(|e| e.into_inner());
        partitions.get(key).cloned()
    }

    fn partition_or_create(&self, key: &str) -> Arc<Mutex<Partition<V>>> {
        if let Some(existing) = self.partition(key) {
            return existing;
        }
        let mut partitions = self.partitions.write().unwrap_or_else(|e| e.into_inner());
        partitions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Partition::default())))
            .clone()
    }

    /// Return every sample in `interval` if it lies inside one covered
    /// interval of the partition stored no longer than `max_age` before
    /// `now`; `None` otherwise.
    pub fn query(
        &self,
        partition_key: &str,
        interval: Interval,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Option<SampleSlice<V>> {
        let partition = self.partition(partition_key)?;
        let mut guard = partition.lock().unwrap_or_else(|e| e.into_inner());
        guard.query(interval, max_age, now)
    }

    /// Store samples fetched for `interval` at `stored_at` and merge it into
    /// the covered set.
    ///
    /// The samples replace whatever the partition held inside `interval`.
    /// Samples outside `interval` are ignored so every stored sample lies in a
    /// covered interval.
    pub fn insert<I>(
        &self,
        partition_key: &str,
        interval: Interval,
        samples: I,
        stored_at: DateTime<Utc>,
    ) -> InsertOutcome
    where
        I: IntoIterator<Item = (u64, V)>,
    {
        let partition = self.partition_or_create(partition_key);
        let mut guard = partition.lock().unwrap_or_else(|e| e.into_inner());

        guard.clear_samples(interval);
        for (pos, value) in samples {
            if interval.contains_position(pos) {
                guard.samples.insert(pos, value);
            }
        }
        guard.merge_covered(interval, stored_at);

        if guard.samples.len() > self.max_samples_per_partition {
            guard.trim();
            tracing::debug!(
                partition = partition_key,
                retained = guard.samples.len(),
                "Range cache partition trimmed"
            );
            InsertOutcome::Trimmed
        } else {
            InsertOutcome::Stored
        }
    }

    /// Covered intervals of a partition, in order.
    pub fn covered_ranges(&self, partition_key: &str) -> Vec<Interval> {
        self.partition(partition_key)
            .map(|p| {
                let guard = p.lock().unwrap_or_else(|e| e.into_inner());
                guard.covered.iter().map(|c| c.interval).collect()
            })
            .unwrap_or_default()
    }

    /// Number of samples retained for a partition.
    pub fn sample_count(&self, partition_key: &str) -> usize {
        self.partition(partition_key)
            .map(|p| p.lock().unwrap_or_else(|e| e.into_inner()).samples.len())
            .unwrap_or(0)
    }

    /// Drop every partition.
    pub fn clear(&self) {
        self.partitions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl<V> std::fmt::Debug for RangeCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeCache")
            .field("max_samples_per_partition", &self.max_samples_per_partition)
            .finish()
    }
}
