//! Crate-wide error type.
//!
//! Transient provider failures never appear here: they are consumed inside
//! the retry loop. What escapes is either a fatal call failure, an exhausted
//! fallback chain, or an internal cache/configuration problem. The whole
//! enum is `Clone` so one outcome can be shared with every coalesced waiter.

use crate::failure::{CallError, FailureKind};
use crate::types::AttemptRecord;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A fatal model call failure (authentication or malformed request).
    /// Surfaced without consuming retry budget or trying further models.
    #[error("model call failed: {0}")]
    Call(#[from] CallError),

    /// Every model in the fallback chain failed after its retry budget.
    #[error("all models exhausted after {} attempts (last failure: {terminal})", .records.len())]
    Exhausted {
        /// Ordered attempt log across the whole chain.
        records: Vec<AttemptRecord>,
        /// Classified kind of the final failure.
        terminal: FailureKind,
    },

    /// Cache entry could not be read. Never aborts a request; callers treat
    /// it as a miss and log it.
    #[error("cache read failed: {0}")]
    CacheRead(String),

    /// Cache entry could not be persisted. Never aborts a request; the
    /// freshly computed result is still returned.
    #[error("cache write failed: {0}")]
    CacheWrite(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// The classified failure kind behind this error, when one exists.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Call(call) => Some(call.kind),
            Self::Exhausted { terminal, .. } => Some(*terminal),
            _ => None,
        }
    }
}

/// Result type alias for the library.
pub type Result<T> = std::result::Result<T, Error>;
