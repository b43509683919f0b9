//! Response adapters.
//!
//! Each adapter turns a raw response body into a domain value or a
//! [`ParseError`]. Adapters are pure and never touch the network, so their
//! classification tables can be tested on fixture bodies alone.
//!
//! Upstream schemas drift. Adapters treat optional fields as optional and
//! fall back to empty or zero values; only a body whose overall shape is
//! wrong is a parse failure.

pub mod conservation;
pub mod structure;
pub mod variants;

pub use conservation::{ConservationAdapter, ScoreSpan};
pub use structure::{ConfidenceBand, StructureAdapter, StructureMetadata};
pub use variants::{Impact, VariantAdapter, VariantRecord};

use locus_core::ParseError;

/// Parse strategy for one service's responses.
pub trait ResponseAdapter {
    type Output;

    /// Service name used in error messages.
    fn service(&self) -> &'static str;

    fn parse(&self, body: &str) -> Result<Self::Output, ParseError>;
}

/// Parse `body` as JSON, mapping syntax errors to a [`ParseError`].
pub(crate) fn parse_json(service: &str, body: &str) -> Result<serde_json::Value, ParseError> {
    serde_json::from_str(body)
        .map_err(|e| ParseError::invalid(service, format!("body is not valid JSON: {}", e)))
}
