//! Locus Storage - Cache Tiers and Fetch Coordination
//!
//! Holds the on-disk keyed store, the in-memory range and memo tiers, the
//! per-region failure ledger and the [`FetchCoordinator`] that routes every
//! lookup through them before touching the network.

pub mod cache;
pub mod coordinator;

pub use cache::{
    CachePayload, CacheRead, CacheStats, DataType, EntryKey, FailureLedger, FileCacheStore,
    Freshness, KeyedStore, MemoCache, RangeCache, SampleSlice,
};
pub use coordinator::{
    CoordinatorConfig, FetchCoordinator, KeyedPayload, KeyedRequest, RangePayload, RangeRequest,
    Sample,
};
