//! Error types for the command-line front end.

use locus_core::{ConfigError, LocusError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Usage: {0}")]
    Usage(String),
    #[error("Unknown data type '{0}' (expected variants, conservation or structure)")]
    UnknownDataType(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Locus(#[from] LocusError),
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}
