//! Per-base conservation scores.

use std::sync::Arc;

use locus_core::{ConservationServiceConfig, FetchResult, LocusResult, Region, ValidationError};
use locus_storage::{
    DataType, FetchCoordinator, FileCacheStore, Freshness, KeyedStore, RangeCache, RangeRequest,
    SampleSlice,
};

use super::{check_span, key_variant, rejected};
use crate::adapters::{ConservationAdapter, ResponseAdapter};
use crate::http::HttpClient;

/// Data type under which conservation scores are cached.
pub const CONSERVATION: &str = "conservation";

/// Façade for the conservation score service.
pub struct ConservationClient<S: KeyedStore = FileCacheStore> {
    http: HttpClient,
    coordinator: Arc<FetchCoordinator<S>>,
    config: ConservationServiceConfig,
    data_type: DataType,
    variant: String,
    tier: RangeCache<f32>,
}

impl<S: KeyedStore> ConservationClient<S> {
    pub fn new(
        config: ConservationServiceConfig,
        http: HttpClient,
        coordinator: Arc<FetchCoordinator<S>>,
        max_samples_per_partition: usize,
    ) -> LocusResult<Self> {
        Ok(Self {
            http,
            coordinator,
            data_type: DataType::new(CONSERVATION)?,
            variant: key_variant(&[&config.genome, &config.track]),
            config,
            tier: RangeCache::new(max_samples_per_partition),
        })
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Scores for every position of `region` that has one.
    pub async fn scores_in_region(
        &self,
        region: &Region,
        force_refresh: bool,
    ) -> FetchResult<SampleSlice<f32>> {
        if let Err(e) = check_span(region, self.config.max_region_span) {
            return rejected(CONSERVATION, e);
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
    }

    /// Mean score in each of `bins` equal-width bins across `region`.
    ///
    /// Bins without any scored position are `None`. Every bin count is
    /// served from the same cached scores.
    pub async fn binned_scores(
        &self,
        region: &Region,
        bins: usize,
        force_refresh: bool,
    ) -> FetchResult<Vec<Option<f32>>> {
        if bins == 0 || bins as u64 > region.span() {
            return rejected(
                CONSERVATION,
                ValidationError::InvalidInterval {
                    start: region.start(),
                    end: region.end(),
                    reason: format!("cannot split {} bases into {} bins", region.span(), bins),
                },
            );
        }
        self.scores_in_region(region, force_refresh)
            .await
            .map(|slice| bin_means(&slice, region, bins))
    }

    /// Drop this service's disk entries and memory tier.
    pub async fn clear_cache(&self) -> u64 {
        self.tier.clear();
        self.coordinator.clear(&self.data_type).await
    }

    async fn fetch_region(&self, region: Region) -> LocusResult<Vec<(u64, f32)>> {
        let url = format!("{}/getData/track", self.config.base_url.trim_end_matches('/'));
        // The service uses 0-based half-open coordinates.
        let query = [
            ("genome", self.config.genome.clone()),
            ("track", self.config.track.clone()),
            ("chrom", region.chrom.as_str().to_string()),
            ("start", (region.start().saturating_sub(1)).to_string()),
            ("end", (region.end() - 1).to_string()),
        ];
        let text = self.http.get_text(&url, &query).await?;
        let spans = ConservationAdapter::for_chrom(region.chrom.clone()).parse(&text)?;

        Ok(spans
            .iter()
            .flat_map(|span| span.positions_within(region.start(), region.end()))
            .collect())
    }
}

fn bin_means(slice: &SampleSlice<f32>, region: &Region, bins: usize) -> Vec<Option<f32>> {
    let span = region.span();
    let mut sums = vec![(0.0f64, 0u32); bins];
    for (pos, value) in slice.iter() {
        let offset = pos - region.start();
        let bin = ((offset as u128 * bins as u128) / span as u128) as usize;
        if let Some((sum, count)) = sums.get_mut(bin) {
            *sum += f64::from(*value);
            *count += 1;
        }
    }
    sums.into_iter()
        .map(|(sum, count)| (count > 0).then(|| (sum / f64::from(count)) as f32))
        .collect()
}

impl<S: KeyedStore> std::fmt::Debug for ConservationClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConservationClient")
            .field("base_url", &self.config.base_url)
            .field("genome", &self.config.genome)
            .field("track", &self.config.track)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locus_core::Interval;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_bin_means() {
        let region = Region::new("1", 100, 140).unwrap();
        let samples: BTreeMap<u64, f32> =
            [(100, 1.0), (105, 3.0), (125, -2.0)].into_iter().collect();
        let slice = SampleSlice::new(Interval::new(100, 140).unwrap(), samples);

        let bins = bin_means(&slice, &region, 4);
        assert_eq!(bins, vec![Some(2.0), None, Some(-2.0), None]);
    }

    #[test]
    fn test_bin_means_single_bin() {
        let region = Region::new("1", 1, 11).unwrap();
        let samples: BTreeMap<u64, f32> = [(1, 1.0), (10, 2.0)].into_iter().collect();
        let slice = SampleSlice::new(Interval::new(1, 11).unwrap(), samples);
        assert_eq!(bin_means(&slice, &region, 1), vec![Some(1.5)]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_full_coverage_fills_every_bin(
            start in 1u64..10_000,
            span in 1u64..500,
            bins in 1usize..64,
        ) {
            prop_assume!(bins as u64 <= span);
            let region = Region::new("1", start, start + span).unwrap();
            let samples: BTreeMap<u64, f32> =
                (start..start + span).map(|pos| (pos, 1.0)).collect();
            let slice = SampleSlice::new(region.interval, samples);

            let means = bin_means(&slice, &region, bins);
            prop_assert_eq!(means.len(), bins);
            prop_assert!(means.iter().all(|m| *m == Some(1.0)));
        }
    }
}
