//! Per-region failure accounting.
//!
//! Network and parse failures are counted against a rounded region key. Once
//! a key reaches the cap, lookups for it are refused without touching the
//! network until the process restarts.

use std::collections::HashMap;
use std::sync::Mutex;

use locus_core::Region;

use super::entry_key::DataType;

/// Ledger key for a region: `<data_type>/<chrom>:<start>-<end>` with the
/// interval snapped outward to `grid`.
///
/// Nearby requests that round to the same cell share one failure budget.
pub fn region_key(data_type: &DataType, region: &Region, grid: u64) -> String {
    let rounded = region.interval.round_outward(grid);
    format!(
        "{}/{}:{}-{}",
        data_type,
        region.chrom,
        rounded.start(),
        rounded.end()
    )
}

/// Ledger key for an identifier lookup: `<data_type>/<identifier>`.
pub fn identifier_key(data_type: &DataType, identifier: &str) -> String {
    format!("{}/{}", data_type, identifier)
}

/// Failure counts per ledger key.
#[derive(Debug)]
pub struct FailureLedger {
    counts: Mutex<HashMap<String, u32>>,
    cap: u32,
}

impl FailureLedger {
    pub fn new(cap: u32) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            cap,
        }
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }

    /// True once `key` has reached the cap.
    pub fn is_exhausted(&self, key: &str) -> bool {
        self.failures(key) >= self.cap
    }

    pub fn failures(&self, key: &str) -> u32 {
        let counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        counts.get(key).copied().unwrap_or(0)
    }

    /// Count one failure and return the new total.
    pub fn record_failure(&self, key: &str) -> u32 {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        let count = counts.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Reset the count after a successful fetch. Exhausted keys stay exhausted.
    pub fn record_success(&self, key: &str) {
        let mut counts = self.counts.lock().unwrap_or_else(|e| e.into_inner());
        if counts.get(key).is_some_and(|count| *count < self.cap) {
            counts.remove(key);
        }
    }
}
