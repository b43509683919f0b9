//! Client façades, one per remote service.
//!
//! A façade validates its input, builds the service request and hands a
//! fetch closure to the shared [`FetchCoordinator`](locus_storage::FetchCoordinator).
//! It never returns an error; every entry point resolves to a
//! [`FetchResult`](locus_core::FetchResult).

pub mod conservation;
pub mod structure;
pub mod variants;

pub use conservation::ConservationClient;
pub use structure::StructureClient;
pub use variants::VariantClient;

use locus_core::{FailureReason, FetchResult, Region, ValidationError};

/// Fold query parameters into a cache key variant.
///
/// Key variants may not contain `_`, so it is replaced with `-`.
pub(crate) fn key_variant(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.replace('_', "-"))
        .collect::<Vec<_>>()
        .join("-")
}

/// Reject regions wider than the service allows.
pub(crate) fn check_span(region: &Region, max: u64) -> Result<(), ValidationError> {
    if region.span() > max {
        return Err(ValidationError::RegionTooLarge {
            span: region.span(),
            max,
        });
    }
    Ok(())
}

/// Log a rejected request and turn it into an `InvalidRequest` failure.
pub(crate) fn rejected<T>(service: &str, error: ValidationError) -> FetchResult<T> {
    tracing::debug!(service, error = %error, "Rejected request");
    FetchResult::failure(FailureReason::InvalidRequest)
}
