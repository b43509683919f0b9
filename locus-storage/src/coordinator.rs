//! Fetch orchestration across the memory tier, the disk tier and the network.
//!
//! Every lookup follows the same route:
//!
//! 1. Build the canonical entry key; a key that cannot be built is an
//!    invalid request.
//! 2. Refuse silently if the rounded region has exhausted its retry budget.
//! 3. Memory tier, then disk tier (both skipped for [`Freshness::Refresh`]).
//! 4. Network, with the fetched interval widened by the configured buffer
//!    and the call bounded by the request timeout.
//! 5. Success writes both tiers under the interval actually fetched.
//!    Failures are classified into a [`FailureReason`] and never written.
//!
//! The coordinator never returns an error: every path ends in a
//! [`FetchResult`].

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use locus_core::{
    Clock, FailureReason, FetchResult, Interval, LocusConfig, LocusError, LocusResult,
    NetworkError, Region,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::entry_key::{validate_store_key, DataType, EntryKey};
use crate::cache::freshness::Freshness;
use crate::cache::ledger::{identifier_key, region_key, FailureLedger};
use crate::cache::memo::MemoCache;
use crate::cache::range_cache::{InsertOutcome, RangeCache, SampleSlice};
use crate::cache::traits::{CachePayload, CacheStats, KeyedStore};

/// Configuration for the fetch coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Maximum age of disk and memory entries.
    pub ttl: Duration,
    /// Consecutive failures after which a rounded region is refused.
    pub retry_cap: u32,
    /// Grid used to round regions for failure accounting.
    pub failure_grid: u64,
    /// Positions added on each side of a range fetch.
    pub fetch_buffer: u64,
    /// Widening never grows a fetch beyond this span.
    pub max_fetch_span: u64,
    /// Upper bound on a single network call.
    pub request_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(7 * 24 * 3600),
            retry_cap: 3,
            failure_grid: 10_000,
            fetch_buffer: 5_000,
            max_fetch_span: 250_000,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_retry_cap(mut self, cap: u32) -> Self {
        self.retry_cap = cap;
        self
    }

    pub fn with_failure_grid(mut self, grid: u64) -> Self {
        self.failure_grid = grid;
        self
    }

    /// Set the widening buffer and the span it may grow a fetch to.
    pub fn with_widening(mut self, buffer: u64, max_span: u64) -> Self {
        self.fetch_buffer = buffer;
        self.max_fetch_span = max_span;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl From<&LocusConfig> for CoordinatorConfig {
    fn from(config: &LocusConfig) -> Self {
        Self {
            ttl: config.cache.ttl(),
            retry_cap: config.cache.retry_cap,
            failure_grid: config.cache.failure_grid,
            fetch_buffer: config.cache.fetch_buffer,
            max_fetch_span: config.cache.max_fetch_span,
            request_timeout: config.network.request_timeout(),
        }
    }
}

/// One sample as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample<V> {
    pub pos: u64,
    pub value: V,
}

/// Disk payload for range-cached data types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "V: Deserialize<'de>"))]
pub struct RangePayload<V> {
    #[serde(default)]
    pub samples: Vec<Sample<V>>,
}

impl<V: Clone> RangePayload<V> {
    fn from_pairs(pairs: Vec<(u64, V)>) -> Self {
        Self {
            samples: pairs
                .into_iter()
                .map(|(pos, value)| Sample { pos, value })
                .collect(),
        }
    }

    fn pairs(&self) -> impl Iterator<Item = (u64, V)> + '_ {
        self.samples.iter().map(|s| (s.pos, s.value.clone()))
    }

    fn slice(&self, interval: Interval) -> SampleSlice<V> {
        let samples = self
            .pairs()
            .filter(|(pos, _)| interval.contains_position(*pos))
            .collect();
        SampleSlice::new(interval, samples)
    }
}

/// Disk payload for identifier-keyed data types. `None` is a cached
/// "confirmed nothing here".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct KeyedPayload<T> {
    #[serde(default)]
    pub value: Option<T>,
}

/// A range lookup.
#[derive(Debug, Clone)]
pub struct RangeRequest {
    pub data_type: DataType,
    pub region: Region,
    /// Query variant folded into the key, e.g. a dataset or track name.
    pub variant: Option<String>,
    pub freshness: Freshness,
}

/// An identifier lookup.
#[derive(Debug, Clone)]
pub struct KeyedRequest {
    pub data_type: DataType,
    pub key: String,
    pub freshness: Freshness,
}

#[derive(Debug, Default)]
struct AtomicStats {
    hits: AtomicU64,
    misses: AtomicU64,
    network_calls: AtomicU64,
    failures: AtomicU64,
    short_circuits: AtomicU64,
    evictions: AtomicU64,
}

impl AtomicStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            network_calls: self.network_calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            short_circuits: self.short_circuits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

/// Routes lookups through the cache tiers and the network.
///
/// One instance is shared by every façade in a process. Memory tiers are
/// owned by the façades and passed in per call, since their value types
/// differ per service.
pub struct FetchCoordinator<S: KeyedStore> {
    store: Arc<S>,
    ledger: FailureLedger,
    config: CoordinatorConfig,
    clock: Arc<dyn Clock>,
    stats: AtomicStats,
}

impl<S: KeyedStore> FetchCoordinator<S> {
    pub fn new(store: Arc<S>, config: CoordinatorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ledger: FailureLedger::new(config.retry_cap),
            config,
            clock,
            stats: AtomicStats::default(),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Consecutive failures recorded against the rounded cell of `region`.
    pub fn region_failures(&self, data_type: &DataType, region: &Region) -> u32 {
        self.ledger
            .failures(&region_key(data_type, region, self.config.failure_grid))
    }

    /// Drop every disk entry of `data_type`. Returns the number removed.
    ///
    /// The failure ledger is left alone: exhausted regions stay refused for
    /// the session.
    pub async fn clear(&self, data_type: &DataType) -> u64 {
        self.store.clear(data_type).await
    }

    /// Look up the samples of a region in a range-mergeable data type.
    ///
    /// `fetch_fn` receives the widened region to request and returns its
    /// samples keyed by position. A lookup whose slice holds no samples is
    /// reported as [`FetchResult::Empty`].
    pub async fn fetch_range<V, F, Fut>(
        &self,
        tier: &RangeCache<V>,
        request: &RangeRequest,
        fetch_fn: F,
    ) -> FetchResult<SampleSlice<V>>
    where
        V: CachePayload,
        F: FnOnce(Region) -> Fut,
        Fut: Future<Output = LocusResult<Vec<(u64, V)>>>,
    {
        let RangeRequest {
            data_type,
            region,
            variant,
            freshness,
        } = request;
        let variant = variant.as_deref();

        if let Err(e) = EntryKey::new(region.chrom.clone(), region.interval, variant) {
            tracing::debug!(data_type = %data_type, error = %e, "Rejected range request");
            return FetchResult::failure(FailureReason::InvalidRequest);
        }

        let ledger_key = region_key(data_type, region, self.config.failure_grid);
        if self.ledger.is_exhausted(&ledger_key) {
            AtomicStats::bump(&self.stats.short_circuits);
            return FetchResult::failure(FailureReason::RegionUnavailable);
        }

        let partition = partition_key(region, variant);

        if let Freshness::MaxAge { max_age } = *freshness {
            let now = self.clock.now();
            if let Some(slice) = tier.query(&partition, region.interval, max_age, now) {
                AtomicStats::bump(&self.stats.hits);
                tracing::debug!(data_type = %data_type, region = %region, "Memory tier hit");
                return slice_result(slice, true);
            }

            let found = self
                .store
                .find_containing::<RangePayload<V>>(
                    data_type,
                    &region.chrom,
                    region.interval,
                    variant,
                    max_age,
                )
                .await;
            if let Some((key, read)) = found {
                AtomicStats::bump(&self.stats.hits);
                tracing::debug!(data_type = %data_type, region = %region, key = %key, "Disk tier hit");
                let cached_at = read.cached_at();
                let payload = read.into_value();
                let slice = payload.slice(region.interval);
                self.fill_range_tier(tier, &partition, key.interval(), payload.pairs(), cached_at);
                return slice_result(slice, true);
            }
        }

        AtomicStats::bump(&self.stats.misses);
        let widened = region
            .interval
            .widen(self.config.fetch_buffer, self.config.max_fetch_span);
        let fetch_region = region.with_interval(widened);
        tracing::debug!(
            data_type = %data_type,
            region = %region,
            fetch = %fetch_region,
            "Cache miss, fetching from network"
        );

        match self.call_network(data_type, fetch_fn(fetch_region)).await {
            Ok(samples) => {
                self.ledger.record_success(&ledger_key);
                let samples: Vec<(u64, V)> = samples
                    .into_iter()
                    .filter(|(pos, _)| widened.contains_position(*pos))
                    .collect();
                let payload = RangePayload::from_pairs(samples);

                if let Ok(key) = EntryKey::new(region.chrom.clone(), widened, variant) {
                    self.store.put(data_type, &key.encode(), &payload).await;
                }
                let now = self.clock.now();
                self.fill_range_tier(tier, &partition, widened, payload.pairs(), now);

                let slice = tier
                    .query(&partition, region.interval, self.config.ttl, now)
                    .unwrap_or_else(|| payload.slice(region.interval));
                slice_result(slice, false)
            }
            Err(e) => self.record_failure(data_type, &ledger_key, &e),
        }
    }

    /// Look up a single identifier-keyed value.
    ///
    /// `fetch_fn` returns `Ok(None)` when the service confirms there is no
    /// data; that answer is cached like any other.
    pub async fn fetch_keyed<T, F, Fut>(
        &self,
        tier: &MemoCache<T>,
        request: &KeyedRequest,
        fetch_fn: F,
    ) -> FetchResult<T>
    where
        T: CachePayload,
        F: FnOnce() -> Fut,
        Fut: Future<Output = LocusResult<Option<T>>>,
    {
        let KeyedRequest {
            data_type,
            key,
            freshness,
        } = request;

        if let Err(e) = validate_store_key(key) {
            tracing::debug!(data_type = %data_type, error = %e, "Rejected keyed request");
            return FetchResult::failure(FailureReason::InvalidRequest);
        }

        let ledger_key = identifier_key(data_type, key);
        if self.ledger.is_exhausted(&ledger_key) {
            AtomicStats::bump(&self.stats.short_circuits);
            return FetchResult::failure(FailureReason::RegionUnavailable);
        }

        if let Freshness::MaxAge { max_age } = *freshness {
            if let Some(value) = tier.get(key, max_age, self.clock.now()) {
                AtomicStats::bump(&self.stats.hits);
                tracing::debug!(data_type = %data_type, key = %key, "Memory tier hit");
                return keyed_result(value, true);
            }

            if let Some(read) = self
                .store
                .get::<KeyedPayload<T>>(data_type, key, max_age)
                .await
            {
                AtomicStats::bump(&self.stats.hits);
                tracing::debug!(data_type = %data_type, key = %key, "Disk tier hit");
                let cached_at = read.cached_at();
                let value = read.into_value().value;
                tier.insert(key, value.clone(), cached_at);
                return keyed_result(value, true);
            }
        }

        AtomicStats::bump(&self.stats.misses);
        tracing::debug!(data_type = %data_type, key = %key, "Cache miss, fetching from network");

        match self.call_network(data_type, fetch_fn()).await {
            Ok(value) => {
                self.ledger.record_success(&ledger_key);
                let payload = KeyedPayload { value };
                self.store.put(data_type, key, &payload).await;
                tier.insert(key, payload.value.clone(), self.clock.now());
                keyed_result(payload.value, false)
            }
            Err(e) => self.record_failure(data_type, &ledger_key, &e),
        }
    }

    async fn call_network<T, Fut>(&self, data_type: &DataType, fut: Fut) -> LocusResult<T>
    where
        Fut: Future<Output = LocusResult<T>>,
    {
        AtomicStats::bump(&self.stats.network_calls);
        match tokio::time::timeout(self.config.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout {
                service: data_type.to_string(),
                after: self.config.request_timeout,
            }
            .into()),
        }
    }

    fn fill_range_tier<V, I>(
        &self,
        tier: &RangeCache<V>,
        partition: &str,
        interval: Interval,
        samples: I,
        stored_at: DateTime<Utc>,
    ) where
        V: Clone,
        I: IntoIterator<Item = (u64, V)>,
    {
        if tier.insert(partition, interval, samples, stored_at) == InsertOutcome::Trimmed {
            AtomicStats::bump(&self.stats.evictions);
        }
    }

    fn record_failure<T>(
        &self,
        data_type: &DataType,
        ledger_key: &str,
        error: &LocusError,
    ) -> FetchResult<T> {
        AtomicStats::bump(&self.stats.failures);
        if error.counts_against_budget() {
            let failures = self.ledger.record_failure(ledger_key);
            if failures == self.ledger.cap() {
                tracing::warn!(
                    data_type = %data_type,
                    key = ledger_key,
                    failures,
                    error = %error,
                    "Retry budget exhausted, refusing further lookups this session"
                );
            } else {
                tracing::debug!(
                    data_type = %data_type,
                    key = ledger_key,
                    failures,
                    error = %error,
                    "Fetch failed"
                );
            }
        }
        FetchResult::failure(error.failure_reason())
    }
}

impl<S: KeyedStore> std::fmt::Debug for FetchCoordinator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

/// Memory-tier partition: the chromosome, qualified by variant when present.
fn partition_key(region: &Region, variant: Option<&str>) -> String {
    match variant {
        Some(v) => format!("{}/{}", region.chrom, v),
        None => region.chrom.to_string(),
    }
}

fn slice_result<V>(slice: SampleSlice<V>, from_cache: bool) -> FetchResult<SampleSlice<V>> {
    if slice.is_empty() {
        FetchResult::Empty
    } else {
        FetchResult::success(slice, from_cache)
    }
}

fn keyed_result<T>(value: Option<T>, from_cache: bool) -> FetchResult<T> {
    match value {
        Some(value) => FetchResult::success(value, from_cache),
        None => FetchResult::Empty,
    }
}
