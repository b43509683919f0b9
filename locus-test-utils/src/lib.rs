//! Locus Test Utilities
//!
//! Shared test infrastructure for the locus workspace:
//! - Proptest generators for coordinates
//! - A counting spy for fetch functions
//! - In-process mock services standing in for remote APIs
//! - Fixture configs and response bodies
//! - Assertions on lookup outcomes

pub use locus_core::{
    Chromosome, FailureReason, FetchResult, Interval, LocusConfig, LocusError, LocusResult,
    Region,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// FETCH SPY
// ============================================================================

/// Counts invocations of a fetch function. Clones share one counter.
#[derive(Debug, Clone, Default)]
pub struct FetchSpy {
    calls: Arc<AtomicUsize>,
}

impl FetchSpy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call.
    pub fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A range fetch function that records the call and returns `samples`
    /// restricted to the requested region.
    pub fn range_fetch<V: Clone>(
        &self,
        samples: Vec<(u64, V)>,
    ) -> impl FnOnce(Region) -> std::future::Ready<LocusResult<Vec<(u64, V)>>> {
        let spy = self.clone();
        move |region: Region| {
            spy.record();
            let within = samples
                .into_iter()
                .filter(|(pos, _)| region.interval.contains_position(*pos))
                .collect();
            std::future::ready(Ok(within))
        }
    }

    /// A range fetch function that records the call and fails with `error`.
    pub fn failing_fetch<V>(
        &self,
        error: LocusError,
    ) -> impl FnOnce(Region) -> std::future::Ready<LocusResult<Vec<(u64, V)>>> {
        let spy = self.clone();
        move |_region: Region| {
            spy.record();
            std::future::ready(Err(error))
        }
    }
}

// ============================================================================
// MOCK SERVICES
// ============================================================================

pub mod mock_server {
    //! In-process HTTP services for exercising the real transport.

    use super::*;
    use axum::http::StatusCode;
    use axum::Router;
    use std::time::Duration;

    /// What a mock service answers to every request.
    #[derive(Debug, Clone)]
    pub struct MockResponse {
        pub status: u16,
        pub body: String,
        pub delay: Duration,
    }

    impl MockResponse {
        pub fn ok(body: impl Into<String>) -> Self {
            Self {
                status: 200,
                body: body.into(),
                delay: Duration::ZERO,
            }
        }

        pub fn status(status: u16, body: impl Into<String>) -> Self {
            Self {
                status,
                body: body.into(),
                delay: Duration::ZERO,
            }
        }

        /// Answer only after `delay`.
        pub fn delayed(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    /// A running mock service bound to a loopback port.
    #[derive(Debug)]
    pub struct MockService {
        base_url: String,
        hits: Arc<AtomicUsize>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl MockService {
        /// Start a service answering every path with `response`.
        pub async fn start(response: MockResponse) -> Self {
            let hits = Arc::new(AtomicUsize::new(0));
            let counter = hits.clone();
            let handler = move || {
                let counter = counter.clone();
                let response = response.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    if !response.delay.is_zero() {
                        tokio::time::sleep(response.delay).await;
                    }
                    let status = StatusCode::from_u16(response.status)
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    (status, response.body)
                }
            };
            let router = Router::new().fallback(handler);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind loopback listener");
            let addr = listener.local_addr().expect("listener address");
            let handle = tokio::spawn(async move {
                let _ = axum::serve(listener, router).await;
            });

            Self {
                base_url: format!("http://{}", addr),
                hits,
                handle,
            }
        }

        pub fn base_url(&self) -> &str {
            &self.base_url
        }

        /// Requests received so far.
        pub fn hits(&self) -> usize {
            self.hits.load(Ordering::SeqCst)
        }
    }

    impl Drop for MockService {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    /// A loopback URL with nothing listening, so connections are refused.
    pub fn refused_base_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        let addr = listener.local_addr().expect("listener address");
        drop(listener);
        format!("http://{}", addr)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for coordinate types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a chromosome from any accepted spelling.
    pub fn arb_chromosome() -> impl Strategy<Value = Chromosome> {
        prop_oneof![
            (1u8..=22).prop_map(|n| n.to_string()),
            (1u8..=22).prop_map(|n| format!("chr{}", n)),
            Just("X".to_string()),
            Just("chrY".to_string()),
            Just("MT".to_string()),
            Just("chrUn_KI270302v1".to_string()),
        ]
        .prop_map(|name| Chromosome::parse(&name).expect("generated names are valid"))
    }

    /// Generate a non-empty interval starting in `[1, max_start)`.
    pub fn arb_interval(max_start: u64, max_len: u64) -> impl Strategy<Value = Interval> {
        (1..max_start.max(2), 1..max_len.max(2)).prop_map(|(start, len)| {
            Interval::new(start, start + len).expect("len is positive")
        })
    }

    pub fn arb_region() -> impl Strategy<Value = Region> {
        (arb_chromosome(), arb_interval(250_000_000, 100_000))
            .prop_map(|(chrom, interval)| Region { chrom, interval })
    }

    /// Generate a sequence of intervals over a small coordinate space, so
    /// overlaps and adjacencies are common.
    pub fn arb_interval_sequence(len: usize) -> impl Strategy<Value = Vec<Interval>> {
        prop::collection::vec(arb_interval(1_000, 80), 1..=len.max(1))
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Configs and canned service responses.

    use super::*;
    use std::path::Path;

    /// A config caching under `root` with every service at `base_url`.
    pub fn test_config(root: &Path, base_url: &str) -> LocusConfig {
        let mut config = LocusConfig::default_for(root);
        config.cache.retry_cap = 2;
        config.cache.fetch_buffer = 100;
        config.network.request_timeout_ms = 500;
        config.services.variants.base_url = base_url.to_string();
        config.services.conservation.base_url = base_url.to_string();
        config.services.structure.base_url = base_url.to_string();
        config
    }

    /// Two variants at one position and one elsewhere on chr1.
    pub fn variants_body() -> String {
        serde_json::json!({
            "data": {
                "region": {
                    "variants": [
                        {
                            "variant_id": "1-1050-G-A", "pos": 1050, "ref": "G", "alt": "A",
                            "consequence": "missense_variant", "rsids": ["rs100"],
                            "exome": {"ac": 2, "an": 1000}, "genome": null
                        },
                        {
                            "variant_id": "1-1050-G-T", "pos": 1050, "ref": "G", "alt": "T",
                            "consequence": "stop_gained"
                        },
                        {
                            "variant_id": "1-1080-C-CT", "pos": 1080, "ref": "C", "alt": "CT",
                            "consequence": "intron_variant",
                            "genome": {"ac": 10, "an": 2000}
                        }
                    ]
                }
            }
        })
        .to_string()
    }

    /// chr1 scores covering 1-based positions 1000..=1009 (0-based 999..1009).
    pub fn conservation_body() -> String {
        serde_json::json!({
            "genome": "hg38",
            "track": "phyloP100way",
            "chrom": "chr1",
            "chr1": [
                {"start": 999, "end": 1004, "value": 1.5},
                {"start": 1004, "end": 1009, "value": -0.5},
                {"start": 1009, "end": 1010, "value": 3.0}
            ]
        })
        .to_string()
    }

    pub fn structure_body() -> String {
        serde_json::json!([{
            "entryId": "AF-P69905-F1",
            "uniprotAccession": "P69905",
            "uniprotDescription": "Hemoglobin subunit alpha",
            "gene": "HBA1",
            "organismScientificName": "Homo sapiens",
            "latestVersion": 4,
            "globalMetricValue": 98.06,
            "uniprotStart": 1,
            "uniprotEnd": 142
        }])
        .to_string()
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on lookup outcomes.

    use super::*;

    /// Assert a successful lookup and return its value.
    #[track_caller]
    pub fn assert_success<T: std::fmt::Debug>(result: FetchResult<T>) -> T {
        match result {
            FetchResult::Success { value, .. } => value,
            other => panic!("Expected Success, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_failure<T: std::fmt::Debug>(result: &FetchResult<T>, reason: FailureReason) {
        assert_eq!(
            result.failure_reason(),
            Some(reason),
            "Expected Failure({}), got: {:?}",
            reason,
            result
        );
    }

    #[track_caller]
    pub fn assert_empty<T: std::fmt::Debug>(result: &FetchResult<T>) {
        assert!(result.is_empty(), "Expected Empty, got: {:?}", result);
    }
}

// ============================================================================
// TESTS
// ============================================================================
