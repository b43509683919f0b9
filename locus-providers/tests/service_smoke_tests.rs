use locus_core::Region;
use locus_providers::{ConfidenceBand, GenomeServices, Impact};
use locus_test_utils::assertions::{assert_empty, assert_failure, assert_success};
use locus_test_utils::fixtures::{
    conservation_body, structure_body, test_config, variants_body,
};
use locus_test_utils::mock_server::{MockResponse, MockService};
use locus_test_utils::FailureReason;
use tempfile::TempDir;

async fn services_for(server: &MockService, dir: &TempDir) -> GenomeServices {
    let config = test_config(dir.path(), server.base_url());
    GenomeServices::from_config(&config).expect("services build")
}

#[tokio::test]
async fn variants_are_fetched_once_then_served_from_memory() {
    let server = MockService::start(MockResponse::ok(variants_body())).await;
    let dir = TempDir::new().unwrap();
    let services = services_for(&server, &dir).await;
    let region = Region::new("1", 1_000, 1_100).unwrap();

    let first = services.variants.variants_in_region(&region, false).await;
    assert!(!first.from_cache());
    let records = assert_success(first);
    let positions: Vec<u64> = records.iter().map(|v| v.position).collect();
    assert_eq!(positions, vec![1_050, 1_050, 1_080]);
    assert_eq!(records[1].impact, Impact::High);

    let second = services.variants.variants_in_region(&region, false).await;
    assert!(second.from_cache());
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn nearby_variant_query_reuses_the_widened_fetch() {
    let server = MockService::start(MockResponse::ok(variants_body())).await;
    let dir = TempDir::new().unwrap();
    let services = services_for(&server, &dir).await;

    services
        .variants
        .variants_in_region(&Region::new("chr1", 1_000, 1_100).unwrap(), false)
        .await;
    let nearby = services
        .variants
        .variants_in_region(&Region::new("1", 1_070, 1_150).unwrap(), false)
        .await;

    assert!(nearby.from_cache());
    let records = assert_success(nearby);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].variant_id, "1-1080-C-CT");
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn region_without_variants_is_empty() {
    let server = MockService::start(MockResponse::ok(variants_body())).await;
    let dir = TempDir::new().unwrap();
    let services = services_for(&server, &dir).await;

    let result = services
        .variants
        .variants_in_region(&Region::new("1", 1_051, 1_079).unwrap(), false)
        .await;
    assert_empty(&result);
}

#[tokio::test]
async fn conservation_scores_and_bins_share_one_fetch() {
    let server = MockService::start(MockResponse::ok(conservation_body())).await;
    let dir = TempDir::new().unwrap();
    let services = services_for(&server, &dir).await;
    let region = Region::new("1", 1_000, 1_010).unwrap();

    let slice = assert_success(services.conservation.scores_in_region(&region, false).await);
    assert_eq!(slice.get(1_000), Some(&1.5));
    assert_eq!(slice.get(1_004), Some(&1.5));
    assert_eq!(slice.get(1_005), Some(&-0.5));
    assert_eq!(slice.get(1_010), None);
    assert_eq!(slice.len(), 10);

    let bins = services.conservation.binned_scores(&region, 2, false).await;
    assert!(bins.from_cache());
    assert_eq!(assert_success(bins), vec![Some(1.5), Some(-0.5)]);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn invalid_bin_counts_are_rejected() {
    let server = MockService::start(MockResponse::ok(conservation_body())).await;
    let dir = TempDir::new().unwrap();
    let services = services_for(&server, &dir).await;
    let region = Region::new("1", 1_000, 1_010).unwrap();

    let zero = services.conservation.binned_scores(&region, 0, false).await;
    assert_failure(&zero, FailureReason::InvalidRequest);
    let too_many = services.conservation.binned_scores(&region, 11, false).await;
    assert_failure(&too_many, FailureReason::InvalidRequest);
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn structure_metadata_and_clear_cache() {
    let server = MockService::start(MockResponse::ok(structure_body())).await;
    let dir = TempDir::new().unwrap();
    let services = services_for(&server, &dir).await;

    let meta = assert_success(services.structure.metadata_for("p69905", false).await);
    assert_eq!(meta.entry_id, "AF-P69905-F1");
    assert_eq!(meta.confidence, Some(ConfidenceBand::VeryHigh));

    let cached = services.structure.metadata_for("P69905", false).await;
    assert!(cached.from_cache());
    assert_eq!(server.hits(), 1);

    assert_eq!(services.structure.clear_cache().await, 1);
    let refetched = services.structure.metadata_for("P69905", false).await;
    assert!(!refetched.from_cache());
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn unknown_accession_is_empty_and_cached() {
    let server = MockService::start(MockResponse::status(404, r#"{"detail":"Not Found"}"#)).await;
    let dir = TempDir::new().unwrap();
    let services = services_for(&server, &dir).await;

    assert_empty(&services.structure.metadata_for("Q00001", false).await);
    assert_empty(&services.structure.metadata_for("Q00001", false).await);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn force_refresh_goes_to_network() {
    let server = MockService::start(MockResponse::ok(structure_body())).await;
    let dir = TempDir::new().unwrap();
    let services = services_for(&server, &dir).await;

    services.structure.metadata_for("P69905", false).await;
    let refreshed = services.structure.metadata_for("P69905", true).await;
    assert!(refreshed.is_success());
    assert!(!refreshed.from_cache());
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn disk_cache_survives_restart() {
    let server = MockService::start(MockResponse::ok(conservation_body())).await;
    let dir = TempDir::new().unwrap();
    let region = Region::new("chr1", 1_000, 1_010).unwrap();

    {
        let services = services_for(&server, &dir).await;
        assert_success(services.conservation.scores_in_region(&region, false).await);
    }

    let restarted = services_for(&server, &dir).await;
    let result = restarted.conservation.scores_in_region(&region, false).await;
    assert!(result.from_cache());
    assert_eq!(server.hits(), 1);
    assert_eq!(restarted.stats().network_calls, 0);
}

#[tokio::test]
async fn validation_failures_never_reach_the_network() {
    let server = MockService::start(MockResponse::ok(variants_body())).await;
    let dir = TempDir::new().unwrap();
    let services = services_for(&server, &dir).await;

    let too_large = Region::new("1", 1, 10_000_000).unwrap();
    let result = services.variants.variants_in_region(&too_large, false).await;
    assert_failure(&result, FailureReason::InvalidRequest);

    let empty = services.structure.metadata_for("   ", false).await;
    assert_failure(&empty, FailureReason::InvalidRequest);

    assert_eq!(server.hits(), 0);
}
