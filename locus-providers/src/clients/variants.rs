//! Population variants in a region.

use std::collections::BTreeMap;
use std::sync::Arc;

use locus_core::{FetchResult, LocusResult, Region, VariantServiceConfig};
use locus_storage::{
    DataType, FetchCoordinator, FileCacheStore, Freshness, KeyedStore, RangeCache, RangeRequest,
};
use serde_json::json;

use super::{check_span, key_variant, rejected};
use crate::adapters::{ResponseAdapter, VariantAdapter, VariantRecord};
use crate::http::HttpClient;

/// Data type under which variant lookups are cached.
pub const VARIANTS: &str = "variants";

const REFERENCE_GENOME: &str = "GRCh38";

const REGION_QUERY: &str = "query VariantsInRegion($chrom: String!, $start: Int!, $stop: Int!, \
$datasetId: DatasetId!, $referenceGenome: ReferenceGenomeId!) { \
region(chrom: $chrom, start: $start, stop: $stop, reference_genome: $referenceGenome) { \
variants(dataset: $datasetId) { variant_id pos ref alt consequence rsids \
exome { ac an } genome { ac an } } } }";

/// Façade for the population variant service.
pub struct VariantClient<S: KeyedStore = FileCacheStore> {
    http: HttpClient,
    coordinator: Arc<FetchCoordinator<S>>,
    config: VariantServiceConfig,
    data_type: DataType,
    variant: String,
    tier: RangeCache<Vec<VariantRecord>>,
}

impl<S: KeyedStore> VariantClient<S> {
    pub fn new(
        config: VariantServiceConfig,
        http: HttpClient,
        coordinator: Arc<FetchCoordinator<S>>,
        max_samples_per_partition: usize,
    ) -> LocusResult<Self> {
        Ok(Self {
            http,
            coordinator,
            data_type: DataType::new(VARIANTS)?,
            variant: key_variant(&[&config.dataset]),
            config,
            tier: RangeCache::new(max_samples_per_partition),
        })
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Variants overlapping `region`, ordered by position.
    pub async fn variants_in_region(
        &self,
        region: &Region,
        force_refresh: bool,
    ) -> FetchResult<Vec<VariantRecord>> {
        if let Err(e) = check_span(region, self.config.max_region_span) {
            return rejected(VARIANTS, e);
        }

        let request = RangeRequest {
            data_type: self.data_type.clone(),
            region: region.clone(),
            variant: Some(self.variant.clone()),
            freshness: Freshness::from_flag(force_refresh, self.coordinator.config().ttl),
        };

        self.coordinator
            .fetch_range(&self.tier, &request, |fetch| self.fetch_region(fetch))
            .await
            .map(|slice| {
                slice
                    .into_samples()
                    .into_values()
                    .flatten()
                    .collect()
            })
    }

    /// Drop this service's disk entries and memory tier.
    pub async fn clear_cache(&self) -> u64 {
        self.tier.clear();
        self.coordinator.clear(&self.data_type).await
    }

    async fn fetch_region(&self, region: Region) -> LocusResult<Vec<(u64, Vec<VariantRecord>)>> {
        let body = json!({
            "query": REGION_QUERY,
            "variables": {
                "chrom": region.chrom.bare(),
                "start": region.start(),
                // The service takes an inclusive stop.
                "stop": region.end() - 1,
                "datasetId": self.config.dataset,
                "referenceGenome": REFERENCE_GENOME,
            }
        });
        let text = self.http.post_json(&self.config.base_url, &body).await?;
        let records = VariantAdapter.parse(&text)?;

        let mut by_position: BTreeMap<u64, Vec<VariantRecord>> = BTreeMap::new();
        for record in records {
            by_position.entry(record.position).or_default().push(record);
        }
        Ok(by_position.into_iter().collect())
    }
}

impl<S: KeyedStore> std::fmt::Debug for VariantClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariantClient")
            .field("base_url", &self.config.base_url)
            .field("dataset", &self.config.dataset)
            .finish()
    }
}
