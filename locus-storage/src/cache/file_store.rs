//! File-backed keyed store.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   <data_type>/
//!     <entry_key>.json
//! ```
//!
//! Each file is a JSON document carrying at least `cachedAt` (epoch
//! milliseconds) and `payload`. Readers ignore unknown fields, and any
//! document that fails to parse is reported as a miss; the next successful
//! fetch overwrites it.
//!
//! Writes go to a temporary sibling first and are renamed into place, so a
//! reader never observes a half-written document.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use locus_core::{CacheIoError, Chromosome, Clock, Interval, SystemClock};
use serde::{Deserialize, Serialize};

use super::entry_key::{validate_store_key, DataType, EntryKey};
use super::freshness::{is_fresh, CacheRead};
use super::traits::{CachePayload, KeyedStore};

/// Document schema version written to every entry.
pub const DOCUMENT_SCHEMA: u32 = 1;

const EXTENSION: &str = "json";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOut<'a, T> {
    schema: u32,
    data_type: &'a str,
    key: &'a str,
    cached_at: i64,
    payload: &'a T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentIn<T> {
    cached_at: i64,
    payload: T,
}

/// Keyed store writing one JSON file per entry.
pub struct FileCacheStore {
    root: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCacheStore {
    /// Create a store rooted at `root`. Directories are created lazily on the
    /// first write to each data type.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, Arc::new(SystemClock))
    }

    pub fn with_clock(root: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn partition_dir(&self, data_type: &DataType) -> PathBuf {
        self.root.join(data_type.as_str())
    }

    fn entry_path(&self, data_type: &DataType, key: &str) -> PathBuf {
        self.partition_dir(data_type)
            .join(format!("{}.{}", key, EXTENSION))
    }

    /// Read and decode one document. `Ok(None)` means the file does not exist.
    async fn read_document<T: CachePayload>(
        &self,
        path: &Path,
    ) -> Result<Option<CacheRead<T>>, CacheIoError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let doc: DocumentIn<T> = serde_json::from_slice(&bytes)
            .map_err(|e| CacheIoError::Deserialization(e.to_string()))?;
        let cached_at = DateTime::<Utc>::from_timestamp_millis(doc.cached_at).ok_or_else(|| {
            CacheIoError::Deserialization(format!("cachedAt out of range: {}", doc.cached_at))
        })?;
        Ok(Some(CacheRead::new(doc.payload, cached_at)))
    }

    async fn write_document<T: CachePayload>(
        &self,
        data_type: &DataType,
        key: &str,
        payload: &T,
    ) -> Result<(), CacheIoError> {
        validate_store_key(key)?;
        let dir = self.partition_dir(data_type);
        tokio::fs::create_dir_all(&dir).await?;

        let doc = DocumentOut {
            schema: DOCUMENT_SCHEMA,
            data_type: data_type.as_str(),
            key,
            cached_at: self.clock.now().timestamp_millis(),
            payload,
        };
        let bytes =
            serde_json::to_vec(&doc).map_err(|e| CacheIoError::Serialization(e.to_string()))?;

        let final_path = self.entry_path(data_type, key);
        let temp_path = dir.join(format!(
            ".{}.{}.{}.tmp",
            key,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&temp_path, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Read an entry, deleting it if it has expired.
    async fn get_fresh<T: CachePayload>(
        &self,
        data_type: &DataType,
        key: &str,
        ttl: Duration,
    ) -> Option<CacheRead<T>> {
        let path = self.entry_path(data_type, key);
        match self.read_document::<T>(&path).await {
            Ok(Some(read)) => {
                if is_fresh(read.cached_at(), self.clock.now(), ttl) {
                    Some(read)
                } else {
                    tracing::debug!(%data_type, key, "Removing expired cache entry");
                    self.remove_path(&path).await;
                    None
                }
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(%data_type, key, error = %e, "Unreadable cache entry treated as miss");
                None
            }
        }
    }

    async fn remove_path(&self, path: &Path) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove cache entry");
            }
        }
    }

    /// List the entry keys stored for a data type.
    async fn list_keys(&self, data_type: &DataType) -> Result<Vec<String>, CacheIoError> {
        let dir = self.partition_dir(data_type);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".json") {
                keys.push(stem.to_string());
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl KeyedStore for FileCacheStore {
    async fn get<T: CachePayload>(
        &self,
        data_type: &DataType,
        key: &str,
        ttl: Duration,
    ) -> Option<CacheRead<T>> {
        if validate_store_key(key).is_err() {
            return None;
        }
        self.get_fresh(data_type, key, ttl).await
    }

    async fn put<T: CachePayload>(&self, data_type: &DataType, key: &str, payload: &T) -> bool {
        match self.write_document(data_type, key, payload).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%data_type, key, error = %e, "Cache write failed; continuing without disk tier");
                false
            }
        }
    }

    async fn clear(&self, data_type: &DataType) -> u64 {
        let count = match self.list_keys(data_type).await {
            Ok(keys) => keys.len() as u64,
            Err(_) => 0,
        };
        let dir = self.partition_dir(data_type);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::info!(%data_type, removed = count, "Cleared cache partition");
                count
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                tracing::warn!(%data_type, error = %e, "Failed to clear cache partition");
                0
            }
        }
    }

    async fn find_containing<T: CachePayload>(
        &self,
        data_type: &DataType,
        chrom: &Chromosome,
        interval: Interval,
        variant: Option<&str>,
        ttl: Duration,
    ) -> Option<(EntryKey, CacheRead<T>)> {
        let keys = match self.list_keys(data_type).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::debug!(%data_type, error = %e, "Cache directory scan failed");
                return None;
            }
        };

        let mut candidates: Vec<EntryKey> = keys
            .iter()
            .filter_map(|k| EntryKey::parse(k))
            .filter(|k| {
                k.chrom() == chrom && k.variant() == variant && k.interval().contains(&interval)
            })
            .collect();
        // The most recently written entry wins; ties go to the tightest.
        candidates.sort_by_key(|k| (k.interval().len(), k.interval().start()));

        let mut best: Option<(EntryKey, CacheRead<T>)> = None;
        for candidate in candidates {
            if let Some(read) = self.get_fresh(data_type, &candidate.encode(), ttl).await {
                let newer = best
                    .as_ref()
                    .map_or(true, |(_, current)| read.cached_at() > current.cached_at());
                if newer {
                    best = Some((candidate, read));
                }
            }
        }
        best
    }
}

impl std::fmt::Debug for FileCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCacheStore")
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_core::ManualClock;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Scores {
        values: Vec<f32>,
    }

    fn setup() -> (TempDir, Arc<ManualClock>, FileCacheStore) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::at_epoch_millis(1_700_000_000_000));
        let store = FileCacheStore::with_clock(dir.path(), clock.clone());
        (dir, clock, store)
    }

    fn scores() -> Scores {
        Scores {
            values: vec![0.5, 1.25],
        }
    }

    fn dt(name: &str) -> DataType {
        DataType::new(name).unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_roundtrip() {
        let (_dir, _clock, store) = setup();
        assert!(store.put(&dt("conservation"), "chr1_100_200", &scores()).await);

        let read = store
            .get::<Scores>(&dt("conservation"), "chr1_100_200", Duration::from_secs(60))
            .await
            .expect("entry present");
        assert_eq!(read.value(), &scores());
        assert_eq!(read.cached_at().timestamp_millis(), 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_directories_created_per_data_type() {
        let (dir, _clock, store) = setup();
        store.put(&dt("variants"), "chr1_1_2", &scores()).await;
        assert!(dir.path().join("variants").join("chr1_1_2.json").is_file());
    }

    #[tokio::test]
    async fn test_ttl_expiry_boundaries() {
        let (dir, clock, store) = setup();
        let ttl = Duration::from_millis(10_000);
        store.put(&dt("variants"), "chr1_1_2", &scores()).await;

        clock.advance(chrono::Duration::milliseconds(9_999));
        assert!(store.get::<Scores>(&dt("variants"), "chr1_1_2", ttl).await.is_some());

        clock.advance(chrono::Duration::milliseconds(2));
        assert!(store.get::<Scores>(&dt("variants"), "chr1_1_2", ttl).await.is_none());
        // Stale entries are removed on read.
        assert!(!dir.path().join("variants").join("chr1_1_2.json").exists());
    }

    #[tokio::test]
    async fn test_overwrite_refreshes_timestamp() {
        let (_dir, clock, store) = setup();
        store.put(&dt("variants"), "k", &scores()).await;
        clock.advance(chrono::Duration::seconds(30));
        let newer = Scores { values: vec![9.0] };
        store.put(&dt("variants"), "k", &newer).await;

        let read = store
            .get::<Scores>(&dt("variants"), "k", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(read.value(), &newer);
        assert_eq!(read.cached_at(), clock.now());
    }

    #[tokio::test]
    async fn test_malformed_document_is_a_miss() {
        let (dir, _clock, store) = setup();
        let path = dir.path().join("variants");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("broken.json"), b"{ not json").unwrap();
        std::fs::write(path.join("wrong_shape.json"), br#"{"cachedAt": "yesterday"}"#).unwrap();

        let ttl = Duration::from_secs(60);
        assert!(store.get::<Scores>(&dt("variants"), "broken", ttl).await.is_none());
        assert!(store.get::<Scores>(&dt("variants"), "wrong_shape", ttl).await.is_none());

        // Self-heals on the next write.
        assert!(store.put(&dt("variants"), "broken", &scores()).await);
        assert!(store.get::<Scores>(&dt("variants"), "broken", ttl).await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_fields_are_ignored() {
        let (dir, clock, store) = setup();
        let path = dir.path().join("variants");
        std::fs::create_dir_all(&path).unwrap();
        let doc = serde_json::json!({
            "schema": 7,
            "cachedAt": clock.now().timestamp_millis(),
            "payload": { "values": [1.0], "addedLater": true },
            "compression": "none",
        });
        std::fs::write(path.join("future.json"), doc.to_string()).unwrap();

        let read = store
            .get::<Scores>(&dt("variants"), "future", Duration::from_secs(60))
            .await
            .expect("forward-compatible document readable");
        assert_eq!(read.value().values, vec![1.0]);
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let dir = TempDir::new().unwrap();
        // A file where the root directory should be makes every write fail.
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, b"occupied").unwrap();
        let store = FileCacheStore::new(&root);

        assert!(!store.put(&dt("variants"), "chr1_1_2", &scores()).await);
        assert!(store
            .get::<Scores>(&dt("variants"), "chr1_1_2", Duration::from_secs(60))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_invalid_keys_are_rejected() {
        let (_dir, _clock, store) = setup();
        assert!(!store.put(&dt("variants"), "../escape", &scores()).await);
        assert!(store
            .get::<Scores>(&dt("variants"), "../escape", Duration::from_secs(60))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_only_one_data_type() {
        let (_dir, _clock, store) = setup();
        let ttl = Duration::from_secs(60);
        store.put(&dt("variants"), "a", &scores()).await;
        store.put(&dt("variants"), "b", &scores()).await;
        store.put(&dt("structure"), "a", &scores()).await;

        assert_eq!(store.clear(&dt("variants")).await, 2);
        assert!(store.get::<Scores>(&dt("variants"), "a", ttl).await.is_none());
        assert!(store.get::<Scores>(&dt("structure"), "a", ttl).await.is_some());
        assert_eq!(store.clear(&dt("variants")).await, 0);
    }

    #[tokio::test]
    async fn test_find_containing_picks_covering_entry() {
        let (_dir, _clock, store) = setup();
        let chr1 = Chromosome::parse("1").unwrap();
        let ttl = Duration::from_secs(60);
        let wide = EntryKey::new(chr1.clone(), Interval::new(0, 10_000).unwrap(), None).unwrap();
        let narrow = EntryKey::new(chr1.clone(), Interval::new(900, 2_000).unwrap(), None).unwrap();
        let other_variant =
            EntryKey::new(chr1.clone(), Interval::new(0, 50_000).unwrap(), Some("bins10")).unwrap();
        store.put(&dt("conservation"), &wide.encode(), &scores()).await;
        store.put(&dt("conservation"), &narrow.encode(), &scores()).await;
        store.put(&dt("conservation"), &other_variant.encode(), &scores()).await;

        let (key, _) = store
            .find_containing::<Scores>(
                &dt("conservation"),
                &chr1,
                Interval::new(1_000, 1_500).unwrap(),
                None,
                ttl,
            )
            .await
            .expect("covered");
        assert_eq!(key, narrow);

        let (key, _) = store
            .find_containing::<Scores>(
                &dt("conservation"),
                &chr1,
                Interval::new(5_000, 9_000).unwrap(),
                None,
                ttl,
            )
            .await
            .expect("covered");
        assert_eq!(key, wide);

        assert!(store
            .find_containing::<Scores>(
                &dt("conservation"),
                &chr1,
                Interval::new(9_000, 11_000).unwrap(),
                None,
                ttl,
            )
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_find_containing_skips_expired() {
        let (_dir, clock, store) = setup();
        let chr2 = Chromosome::parse("chr2").unwrap();
        let key = EntryKey::new(chr2.clone(), Interval::new(0, 100).unwrap(), None).unwrap();
        store.put(&dt("variants"), &key.encode(), &scores()).await;
        clock.advance(chrono::Duration::seconds(120));

        assert!(store
            .find_containing::<Scores>(
                &dt("variants"),
                &chr2,
                Interval::new(10, 20).unwrap(),
                None,
                Duration::from_secs(60),
            )
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_find_containing_prefers_newest_entry() {
        let (_dir, clock, store) = setup();
        let chr1 = Chromosome::parse("1").unwrap();
        let ttl = Duration::from_secs(600);
        let older = EntryKey::new(chr1.clone(), Interval::new(900, 1_200).unwrap(), None).unwrap();
        let newer = EntryKey::new(chr1.clone(), Interval::new(850, 1_250).unwrap(), None).unwrap();
        store.put(&dt("conservation"), &older.encode(), &scores()).await;
        clock.advance(chrono::Duration::seconds(60));
        let refreshed = Scores { values: vec![-1.0] };
        store.put(&dt("conservation"), &newer.encode(), &refreshed).await;

        let (key, read) = store
            .find_containing::<Scores>(
                &dt("conservation"),
                &chr1,
                Interval::new(1_000, 1_100).unwrap(),
                None,
                ttl,
            )
            .await
            .expect("covered");
        assert_eq!(key, newer);
        assert_eq!(read.value(), &refreshed);
    }
}
