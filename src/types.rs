//! Core request and result types.

use crate::failure::FailureKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Analysis task to run against a text payload.
///
/// The task identifier participates in the request fingerprint, so the same
/// text submitted under two different tasks never shares a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Classify,
    ExtractEntities,
    Summarize,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::ExtractEntities => "extract_entities",
            Self::Summarize => "summarize",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Model-invocation parameters for a single request.
///
/// Only deterministic parameter sets (temperature of exactly zero) are
/// cache-eligible; anything else bypasses the cache entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationParams {
    pub temperature: f64,
    pub max_output_tokens: u32,
    /// Per-attempt timeout, distinct from the retry/backoff budget.
    pub timeout: Duration,
}

impl Default for InvocationParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_output_tokens: 1024,
            timeout: Duration::from_secs(30),
        }
    }
}

impl InvocationParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether two requests with these parameters are interchangeable.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        self.temperature == 0.0
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Raw response from a single successful model call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// The sole success artifact returned to callers. Immutable once built.
#[derive(Debug, Clone)]
pub struct CallResult {
    pub text: String,
    pub model_used: String,
    pub cache_hit: bool,
    /// Total attempts issued across the whole fallback chain; zero on a
    /// cache hit.
    pub attempt_count: u32,
    pub latency: Duration,
    pub usage: TokenUsage,
}

/// One attempt against one model, recorded for failure diagnostics.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub model: String,
    /// 1-based attempt number within that model's retry sequence.
    pub attempt: u32,
    /// `None` for the successful attempt.
    pub error: Option<FailureKind>,
    pub elapsed: Duration,
}
