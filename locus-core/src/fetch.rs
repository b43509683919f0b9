//! Terminal outcomes of a lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, user-displayable classification of a failed lookup.
///
/// The UI keys "unavailable" styling off these values, so the string forms
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The remote host could not be reached.
    NetworkOffline,
    /// The request exceeded the configured timeout.
    TimedOut,
    /// The service answered with an error status.
    RemoteError,
    /// The service answered with a payload we could not understand.
    MalformedResponse,
    /// The rounded region exhausted its retry budget this session.
    RegionUnavailable,
    /// The request itself was rejected before any I/O.
    InvalidRequest,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkOffline => "network offline",
            Self::TimedOut => "timed out",
            Self::RemoteError => "remote error",
            Self::MalformedResponse => "malformed response",
            Self::RegionUnavailable => "region unavailable",
            Self::InvalidRequest => "invalid request",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an asynchronous lookup. Every lookup ends in exactly one of
/// these; callers must not render `Failure` as `Empty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchResult<T> {
    /// Data is available.
    Success { value: T, from_cache: bool },
    /// The service was reached and confirmed there is nothing here.
    Empty,
    /// The lookup failed; see the reason.
    Failure { reason: FailureReason },
}

impl<T> FetchResult<T> {
    pub fn success(value: T, from_cache: bool) -> Self {
        Self::Success { value, from_cache }
    }

    pub fn failure(reason: FailureReason) -> Self {
        Self::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// True only for a successful lookup answered from either cache tier.
    pub fn from_cache(&self) -> bool {
        matches!(self, Self::Success { from_cache: true, .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Failure { reason } => Some(*reason),
            _ => None,
        }
    }

    pub fn map<U, F>(self, f: F) -> FetchResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success { value, from_cache } => FetchResult::Success {
                value: f(value),
                from_cache,
            },
            Self::Empty => FetchResult::Empty,
            Self::Failure { reason } => FetchResult::Failure { reason },
        }
    }
}
