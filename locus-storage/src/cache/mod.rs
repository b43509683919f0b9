//! Cache tiers for region-addressed data.
//!
//! Two tiers sit in front of every remote service:
//!
//! - a memory tier, either a range-merging [`RangeCache`] for positional
//!   scores or a bounded [`MemoCache`] for identifier lookups, and
//! - a durable [`KeyedStore`] with TTL expiry, implemented on the filesystem
//!   by [`FileCacheStore`].
//!
//! Keys are built through [`EntryKey`], which only accepts a normalized
//! chromosome, so two spellings of one region always share an entry.
//!
//! # Example
//!
//! ```ignore
//! let store = FileCacheStore::new("/var/cache/locus");
//! let key = EntryKey::new(Chromosome::parse("1")?, Interval::new(100, 200)?, None)?;
//! store.put(&DataType::new("conservation")?, &key.encode(), &payload).await;
//! ```

pub mod entry_key;
pub mod file_store;
pub mod freshness;
pub mod ledger;
pub mod memo;
pub mod range_cache;
pub mod traits;

pub use entry_key::{validate_store_key, DataType, EntryKey};
pub use file_store::FileCacheStore;
pub use freshness::{is_fresh, CacheRead, Freshness};
pub use ledger::{identifier_key, region_key, FailureLedger};
pub use memo::MemoCache;
pub use range_cache::{InsertOutcome, RangeCache, SampleSlice};
pub use traits::{CachePayload, CacheStats, KeyedStore};
