//! Provider failure classification.
//!
//! Every error surfaced at the model-call boundary is classified into one of
//! a small, closed set of kinds. Retry and fallback decisions key off these
//! kinds only, so no layer above the invoker ever inspects transport-specific
//! error types.
//!
//! | Kind | Retryable | Fatal |
//! |------|-----------|-------|
//! | `RateLimited` | yes | no |
//! | `Timeout` | yes | no |
//! | `ServerError` | yes | no |
//! | `AuthFailed` | no | yes |
//! | `InvalidRequest` | no | yes |

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classified failure kind from a single model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Request rate limit exceeded (HTTP 429).
    RateLimited,
    /// The attempt exceeded its per-call timeout, or the provider timed out.
    Timeout,
    /// Internal or transient server error on the provider side (5xx).
    ServerError,
    /// Invalid, expired, or missing credentials (HTTP 401/403).
    AuthFailed,
    /// Malformed request; will fail on every model (HTTP 400 family).
    InvalidRequest,
}

impl FailureKind {
    /// Stable name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::ServerError => "server_error",
            Self::AuthFailed => "auth_failed",
            Self::InvalidRequest => "invalid_request",
        }
    }

    /// Whether another attempt against the same model can succeed.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout | Self::ServerError)
    }

    /// Fatal kinds abort the attempt sequence immediately; spending the
    /// remaining retry budget on them only wastes cost and time.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        !self.retryable()
    }

    /// Maps an HTTP status code to the most likely failure kind.
    ///
    /// Statuses without a specific mapping collapse into the closest class:
    /// unmapped 4xx is treated as `InvalidRequest`, everything else as
    /// `ServerError` (retryable, the conservative choice for the unknown).
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::AuthFailed,
            408 | 504 => Self::Timeout,
            429 => Self::RateLimited,
            400..=499 => Self::InvalidRequest,
            _ => Self::ServerError,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single failed model call: the classified kind plus a short description.
///
/// `Clone` so that coalesced waiters can all receive the same failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct CallError {
    pub kind: FailureKind,
    pub message: String,
}

impl CallError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
