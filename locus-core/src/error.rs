//! Error types for locus operations

use crate::fetch::FailureReason;
use std::time::Duration;
use thiserror::Error;

/// Input validation errors. Reported immediately, never cached or retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid interval [{start}, {end}): {reason}")]
    InvalidInterval { start: u64, end: u64, reason: String },

    #[error("Region spans {span} bases, maximum is {max}")]
    RegionTooLarge { span: u64, max: u64 },

    #[error("Identifier must not be empty")]
    EmptyIdentifier,

    #[error("Invalid identifier {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: String },

    #[error("Invalid chromosome name: {name:?}")]
    InvalidChromosome { name: String },

    #[error("Invalid region string: {input:?}")]
    InvalidRegion { input: String },
}

/// Transport-level failures talking to a remote service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Could not connect to {service}: {reason}")]
    Offline { service: String, reason: String },

    #[error("Request to {service} timed out after {after:?}")]
    Timeout { service: String, after: Duration },

    #[error("Request to {service} failed with status {status}: {message}")]
    Status {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Transport error talking to {service}: {reason}")]
    Transport { service: String, reason: String },
}

/// Payload-shape mismatch in a service response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },
}

impl ParseError {
    pub fn invalid(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.into(),
            reason: reason.into(),
        }
    }
}

/// Disk cache failures. Absorbed by the storage layer, never shown to callers.
#[derive(Debug, Error)]
pub enum CacheIoError {
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization error: {0}")]
    Serialization(String),

    #[error("Cache deserialization error: {0}")]
    Deserialization(String),

    #[error("Invalid cache key component {component:?}: {reason}")]
    InvalidKey { component: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or LOCUS_CONFIG)")]
    MissingConfigPath,

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Master error type for all locus errors.
#[derive(Debug, Error)]
pub enum LocusError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheIoError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl LocusError {
    /// Collapse this error into the stable reason shown to users.
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            Self::Validation(_) | Self::Config(_) => FailureReason::InvalidRequest,
            Self::Network(NetworkError::Offline { .. }) => FailureReason::NetworkOffline,
            Self::Network(NetworkError::Timeout { .. }) => FailureReason::TimedOut,
            Self::Network(NetworkError::Status { .. } | NetworkError::Transport { .. }) => {
                FailureReason::RemoteError
            }
            Self::Parse(_) => FailureReason::MalformedResponse,
            // Cache errors should never reach a caller; treat them like an
            // unusable upstream if one does.
            Self::Cache(_) => FailureReason::RemoteError,
        }
    }

    /// Whether this error consumes the per-region retry budget.
    pub fn counts_against_budget(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Parse(_))
    }
}

/// Result type alias for locus operations.
pub type LocusResult<T> = Result<T, LocusError>;
