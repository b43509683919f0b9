//! Locus Providers - Remote Annotation Services
//!
//! HTTP transport, response adapters and one client façade per remote
//! service:
//!
//! - [`VariantClient`]: population variants in a region
//! - [`ConservationClient`]: per-base conservation scores in a region
//! - [`StructureClient`]: predicted structure metadata by accession
//!
//! [`GenomeServices`] wires all three to one shared
//! [`FetchCoordinator`](locus_storage::FetchCoordinator).

pub mod adapters;
pub mod clients;
pub mod http;
pub mod services;

pub use adapters::{
    ConfidenceBand, ConservationAdapter, Impact, ResponseAdapter, ScoreSpan, StructureAdapter,
    StructureMetadata, VariantAdapter, VariantRecord,
};
pub use clients::conservation::CONSERVATION;
pub use clients::structure::{normalize_accession, STRUCTURE};
pub use clients::variants::VARIANTS;
pub use clients::{ConservationClient, StructureClient, VariantClient};
pub use http::HttpClient;
pub use services::GenomeServices;
