//! Model invocation boundary.
//!
//! [`ModelInvoker`] is the capability seam between the orchestration layers
//! and a concrete provider endpoint: one implementation per model identity,
//! iterated in priority order by the orchestrator. Nothing above this trait
//! branches on model names.

mod http;

pub use http::HttpInvoker;

use crate::failure::CallError;
use crate::types::{InvocationParams, ModelResponse, TokenUsage};
use async_trait::async_trait;

/// Position of a model in the fallback chain, plus its pricing class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    /// Lower priority is tried first; ties break by declaration order.
    pub priority: u32,
    pub cost_tier: CostTier,
}

impl ModelSpec {
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        let name = name.into();
        let cost_tier = CostTier::for_model(&name);
        Self {
            name,
            priority,
            cost_tier,
        }
    }

    pub fn with_cost_tier(mut self, cost_tier: CostTier) -> Self {
        self.cost_tier = cost_tier;
        self
    }
}

/// Pricing class with USD rates per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostTier {
    Economy,
    Standard,
    Premium,
}

impl CostTier {
    /// Tier for a known model name; unknown models default to `Economy`.
    pub fn for_model(name: &str) -> Self {
        match name {
            "gpt-4-turbo" => Self::Premium,
            "gpt-4o" => Self::Standard,
            "gpt-4o-mini" => Self::Economy,
            _ => Self::Economy,
        }
    }

    /// (input, output) price per 1M tokens in USD.
    fn rates(&self) -> (f64, f64) {
        match self {
            Self::Economy => (0.15, 0.60),
            Self::Standard => (2.50, 10.00),
            Self::Premium => (10.00, 30.00),
        }
    }

    /// Estimated cost of one call in USD.
    pub fn estimate_cost(&self, usage: &TokenUsage) -> f64 {
        let (input, output) = self.rates();
        (usage.prompt_tokens as f64 * input + usage.completion_tokens as f64 * output)
            / 1_000_000.0
    }
}

/// A single external model call. Implementations classify every failure into
/// a [`CallError`] so the retry layer never sees transport detail.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    fn spec(&self) -> &ModelSpec;

    async fn call(
        &self,
        payload: &str,
        params: &InvocationParams,
    ) -> std::result::Result<ModelResponse, CallError>;
}
