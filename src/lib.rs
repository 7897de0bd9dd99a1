//! # llm-relay
//!
//! Resilient invocation layer for hosted language models: given a text
//! payload and a task (classify / extract entities / summarize), produce a
//! response while tolerating transient provider failures, avoiding redundant
//! paid calls, and degrading gracefully across a priority-ordered chain of
//! models.
//!
//! ## Key Features
//!
//! - **Response caching**: deterministic requests (temperature zero) are
//!   fingerprinted and served from a TTL-bounded disk cache via the [`cache`]
//!   module.
//! - **Retry with backoff**: transient failures retry with exponential
//!   backoff and jitter; fatal failures fail fast ([`retry`]).
//! - **Multi-model fallback**: models are tried in priority order until one
//!   succeeds ([`orchestrator`]).
//! - **Request coalescing**: concurrent identical requests share a single
//!   upstream call.
//! - **Stable error taxonomy**: internal failures translate into
//!   display-ready errors with remediation hints ([`translate`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use llm_relay::{InvocationParams, Orchestrator, RelayConfig, Task};
//!
//! #[tokio::main]
//! async fn main() -> llm_relay::Result<()> {
//!     let orchestrator = Orchestrator::from_config(&RelayConfig::default())?;
//!
//!     let result = orchestrator
//!         .invoke(Task::Summarize, "EMPLOYMENT CONTRACT ...", &InvocationParams::default())
//!         .await?;
//!
//!     println!("{} (model: {}, cached: {})", result.text, result.model_used, result.cache_hit);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`orchestrator`] | Cache check, coalescing, fallback chain |
//! | [`retry`] | Bounded retry with exponential backoff and jitter |
//! | [`cache`] | Fingerprinting and TTL-based response caching |
//! | [`invoker`] | Model call boundary and HTTP implementation |
//! | [`failure`] | Provider failure classification |
//! | [`translate`] | User-facing error translation |
//! | [`config`] | Recognized configuration options |

pub mod cache;
pub mod config;
pub mod failure;
pub mod invoker;
pub mod orchestrator;
pub mod retry;
pub mod translate;
pub mod types;

// Re-export main types for convenience
pub use cache::{Fingerprint, ResponseCache};
pub use config::RelayConfig;
pub use failure::{CallError, FailureKind};
pub use invoker::{CostTier, HttpInvoker, ModelInvoker, ModelSpec};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use retry::{RetryConfig, RetryExecutor};
pub use translate::{translate, ErrorCategory, UserFacingError};
pub use types::{AttemptRecord, CallResult, InvocationParams, ModelResponse, Task, TokenUsage};

/// Error type for the library
pub mod error;
pub use error::{Error, Result};
