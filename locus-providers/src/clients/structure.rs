//! Predicted structure metadata by UniProt accession.

use std::sync::Arc;

use locus_core::{
    FetchResult, LocusError, LocusResult, NetworkError, StructureServiceConfig, ValidationError,
};
use locus_storage::{
    DataType, FetchCoordinator, FileCacheStore, Freshness, KeyedRequest, KeyedStore, MemoCache,
};
use once_cell::sync::Lazy;
use regex::Regex;

use super::rejected;
use crate::adapters::{ResponseAdapter, StructureAdapter, StructureMetadata};
use crate::http::HttpClient;

/// Data type under which structure metadata is cached.
pub const STRUCTURE: &str = "structure";

static ACCESSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[OPQ][0-9][A-Z0-9]{3}[0-9]|[A-NR-Z][0-9](?:[A-Z][A-Z0-9]{2}[0-9]){1,2})$")
        .expect("accession pattern is valid")
});

/// Normalize and validate a UniProt accession.
pub fn normalize_accession(identifier: &str) -> Result<String, ValidationError> {
    let accession = identifier.trim().to_ascii_uppercase();
    if accession.is_empty() {
        return Err(ValidationError::EmptyIdentifier);
    }
    if !ACCESSION_RE.is_match(&accession) {
        return Err(ValidationError::InvalidIdentifier {
            id: identifier.to_string(),
            reason: "not a UniProt accession".to_string(),
        });
    }
    Ok(accession)
}

/// Façade for the structure prediction service.
pub struct StructureClient<S: KeyedStore = FileCacheStore> {
    http: HttpClient,
    coordinator: Arc<FetchCoordinator<S>>,
    config: StructureServiceConfig,
    data_type: DataType,
    tier: MemoCache<StructureMetadata>,
}

impl<S: KeyedStore> StructureClient<S> {
    pub fn new(
        config: StructureServiceConfig,
        http: HttpClient,
        coordinator: Arc<FetchCoordinator<S>>,
        max_memo_entries: usize,
    ) -> LocusResult<Self> {
        Ok(Self {
            http,
            coordinator,
            config,
            data_type: DataType::new(STRUCTURE)?,
            tier: MemoCache::new(max_memo_entries),
        })
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Metadata for the predicted structure of a protein.
    ///
    /// `Empty` means the service has no prediction for the accession.
    pub async fn metadata_for(
        &self,
        identifier: &str,
        force_refresh: bool,
    ) -> FetchResult<StructureMetadata> {
        let accession = match normalize_accession(identifier) {
            Ok(accession) => accession,
            Err(e) => return rejected(STRUCTURE, e),
        };

        let request = KeyedRequest {
            data_type: self.data_type.clone(),
            key: accession.clone(),
            freshness: Freshness::from_flag(force_refresh, self.coordinator.config().ttl),
        };
        self.coordinator
            .fetch_keyed(&self.tier, &request, || self.fetch_prediction(accession))
            .await
    }

    /// Drop this service's disk entries and memory tier.
    pub async fn clear_cache(&self) -> u64 {
        self.tier.clear();
        self.coordinator.clear(&self.data_type).await
    }

    async fn fetch_prediction(&self, accession: String) -> LocusResult<Option<StructureMetadata>> {
        let url = format!(
            "{}/prediction/{}",
            self.config.base_url.trim_end_matches('/'),
            accession
        );
        let text = match self.http.get_text(&url, &[]).await {
            Ok(text) => text,
            // Unknown accessions are answered with 404.
            Err(LocusError::Network(NetworkError::Status { status: 404, .. })) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(StructureAdapter::for_accession(accession).parse(&text)?)
    }
}

impl<S: KeyedStore> std::fmt::Debug for StructureClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructureClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}
