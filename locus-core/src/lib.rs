//! Locus Core - Data Types
//!
//! Coordinates, lookup outcomes, errors and configuration shared by the cache
//! and provider crates. This crate performs no I/O beyond reading its own
//! config file.

pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod region;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    CacheSection, ConservationServiceConfig, LocusConfig, NetworkSection, ServicesSection,
    StructureServiceConfig, VariantServiceConfig, CONFIG_ENV_VAR,
};
pub use error::{
    CacheIoError, ConfigError, LocusError, LocusResult, NetworkError, ParseError,
    ValidationError,
};
pub use fetch::{FailureReason, FetchResult};
pub use region::{Chromosome, Interval, Region, MIN_POSITION};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
