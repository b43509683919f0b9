//! Process-wide service context.
//!
//! One [`GenomeServices`] is built at startup and passed to whatever needs
//! lookups. It owns the single coordinator, disk store and failure ledger
//! shared by all façades.

use std::sync::Arc;

use locus_core::{Clock, LocusConfig, LocusResult, SystemClock};
use locus_storage::{CacheStats, CoordinatorConfig, FetchCoordinator, FileCacheStore};

use crate::clients::conservation::CONSERVATION;
use crate::clients::structure::STRUCTURE;
use crate::clients::variants::VARIANTS;
use crate::clients::{ConservationClient, StructureClient, VariantClient};
use crate::http::HttpClient;

/// The three service façades sharing one coordinator.
#[derive(Debug)]
pub struct GenomeServices {
    pub variants: VariantClient,
    pub conservation: ConservationClient,
    pub structure: StructureClient,
    coordinator: Arc<FetchCoordinator<FileCacheStore>>,
}

impl GenomeServices {
    /// Build every façade from a validated configuration.
    pub fn from_config(config: &LocusConfig) -> LocusResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// As [`GenomeServices::from_config`], reading time from `clock`.
    pub fn with_clock(config: &LocusConfig, clock: Arc<dyn Clock>) -> LocusResult<Self> {
        let store = Arc::new(FileCacheStore::with_clock(
            config.cache.root_dir.clone(),
            clock.clone(),
        ));
        let coordinator = Arc::new(FetchCoordinator::new(
            store,
            CoordinatorConfig::from(config),
            clock,
        ));
        let max_samples = config.cache.max_samples_per_partition;

        let variants = VariantClient::new(
            config.services.variants.clone(),
            HttpClient::new(VARIANTS, &config.network)?,
            coordinator.clone(),
            max_samples,
        )?;
        let conservation = ConservationClient::new(
            config.services.conservation.clone(),
            HttpClient::new(CONSERVATION, &config.network)?,
            coordinator.clone(),
            max_samples,
        )?;
        let structure = StructureClient::new(
            config.services.structure.clone(),
            HttpClient::new(STRUCTURE, &config.network)?,
            coordinator.clone(),
            config.cache.max_memo_entries,
        )?;

        tracing::debug!(
            root_dir = %config.cache.root_dir.display(),
            "Genome services initialized"
        );

        Ok(Self {
            variants,
            conservation,
            structure,
            coordinator,
        })
    }

    pub fn stats(&self) -> CacheStats {
        self.coordinator.stats()
    }

    /// Clear every service's caches. Returns the number of disk entries
    /// removed.
    pub async fn clear_all(&self) -> u64 {
        self.variants.clear_cache().await
            + self.conservation.clear_cache().await
            + self.structure.clear_cache().await
    }
}
