//! Fallback orchestration.
//!
//! Top-level entry point for the invocation layer. One [`Orchestrator::invoke`]
//! call:
//!
//! 1. fingerprints the request and probes the cache (deterministic requests
//!    only),
//! 2. coalesces with any identical in-flight request, so a fingerprint has
//!    at most one external call sequence running at a time,
//! 3. on a miss, drives the priority-ordered model chain through
//!    [`RetryExecutor`] until one succeeds,
//! 4. writes successful deterministic results through to the cache, and
//! 5. translates total failure into [`Error::Exhausted`] with the full
//!    attempt log.
//!
//! The chain itself runs on a spawned task, so a caller that gives up does
//! not cancel an upstream call that was already sent; the result is simply
//! discarded (or picked up by the cache and any remaining waiters).

use crate::cache::{Fingerprint, ResponseCache};
use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::failure::{CallError, FailureKind};
use crate::invoker::{HttpInvoker, ModelInvoker};
use crate::retry::{RetryConfig, RetryExecutor};
use crate::types::{AttemptRecord, CallResult, InvocationParams, Task};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

/// Shared outcome of one orchestration flight.
type Flight = std::result::Result<CallResult, Error>;

pub struct OrchestratorBuilder {
    invokers: Vec<Arc<dyn ModelInvoker>>,
    cache: Option<ResponseCache>,
    retry: RetryConfig,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            invokers: Vec::new(),
            cache: None,
            retry: RetryConfig::default(),
        }
    }

    /// Adds a model to the fallback chain. Declaration order breaks priority
    /// ties.
    pub fn with_invoker(mut self, invoker: Arc<dyn ModelInvoker>) -> Self {
        self.invokers.push(invoker);
        self
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        if self.invokers.is_empty() {
            return Err(Error::Configuration(
                "fallback chain needs at least one model".into(),
            ));
        }
        let mut chain = self.invokers;
        // Stable sort: ties keep declaration order.
        chain.sort_by_key(|invoker| invoker.spec().priority);

        Ok(Orchestrator {
            chain,
            cache: Arc::new(self.cache.unwrap_or_else(ResponseCache::disabled)),
            retry: self.retry,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Orchestrator {
    chain: Vec<Arc<dyn ModelInvoker>>,
    cache: Arc<ResponseCache>,
    retry: RetryConfig,
    /// At most one external call sequence per fingerprint; later arrivals
    /// subscribe to the leader's outcome.
    inflight: Arc<Mutex<HashMap<String, broadcast::Sender<Flight>>>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("chain_len", &self.chain.len())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Wires a full orchestrator from configuration: HTTP invokers for the
    /// primary and fallback models, and a disk cache when enabled.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = OrchestratorBuilder::new().with_retry(config.retry_config());
        for (position, name) in config.model_chain().into_iter().enumerate() {
            let invoker = HttpInvoker::new(name, position as u32 + 1, config.base_url.as_str())?;
            builder = builder.with_invoker(Arc::new(invoker));
        }
        let cache = if config.cache_enabled {
            ResponseCache::disk(&config.cache_dir, config.default_cache_ttl())
        } else {
            ResponseCache::disabled()
        };
        builder.with_cache(cache).build()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Runs one task against the fallback chain.
    pub async fn invoke(
        &self,
        task: Task,
        text: &str,
        params: &InvocationParams,
    ) -> Result<CallResult> {
        let started = Instant::now();
        let fingerprint = Fingerprint::compute(task, text, params);
        let deterministic = params.is_deterministic();

        loop {
            if deterministic {
                if let Some(entry) = self.cache.get(&fingerprint).await {
                    debug!(
                        task = task.as_str(),
                        fingerprint = fingerprint.as_str(),
                        model = entry.model.as_str(),
                        "cache hit"
                    );
                    return Ok(CallResult {
                        text: entry.text,
                        model_used: entry.model,
                        cache_hit: true,
                        attempt_count: 0,
                        latency: started.elapsed(),
                        usage: entry.usage,
                    });
                }
            }

            let (mut receiver, lead) = {
                let mut inflight = self.inflight.lock().await;
                match inflight.get(fingerprint.as_str()) {
                    Some(sender) => (sender.subscribe(), None),
                    None => {
                        let (sender, receiver) = broadcast::channel(1);
                        inflight.insert(fingerprint.as_str().to_string(), sender.clone());
                        (receiver, Some(sender))
                    }
                }
            };
            if let Some(sender) = lead {
                self.spawn_flight(sender, task, text, params, &fingerprint, deterministic);
            }

            match receiver.recv().await {
                Ok(outcome) => return outcome,
                // The flight ended without an outcome (should not happen:
                // flights run on detached tasks). Start over.
                Err(_) => continue,
            }
        }
    }

    /// Starts the external call sequence on a detached task. Calls already
    /// sent cannot be un-sent, so abandoning callers must not cancel it.
    fn spawn_flight(
        &self,
        sender: broadcast::Sender<Flight>,
        task: Task,
        text: &str,
        params: &InvocationParams,
        fingerprint: &Fingerprint,
        deterministic: bool,
    ) {
        let chain = self.chain.clone();
        let retry = self.retry.clone();
        let cache = self.cache.clone();
        let inflight = self.inflight.clone();
        let payload = text.to_string();
        let params = params.clone();
        let fingerprint = fingerprint.clone();

        tokio::spawn(async move {
            let outcome = run_chain(
                &chain,
                retry,
                &cache,
                task,
                &payload,
                &params,
                &fingerprint,
                deterministic,
            )
            .await;
            inflight.lock().await.remove(fingerprint.as_str());
            // No receivers left means every caller went away; the result was
            // still cached above when eligible.
            let _ = sender.send(outcome);
        });
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_chain(
    chain: &[Arc<dyn ModelInvoker>],
    retry: RetryConfig,
    cache: &ResponseCache,
    task: Task,
    payload: &str,
    params: &InvocationParams,
    fingerprint: &Fingerprint,
    deterministic: bool,
) -> Flight {
    let started = Instant::now();
    let executor = RetryExecutor::new(retry);
    let mut records: Vec<AttemptRecord> = Vec::new();
    let mut terminal = FailureKind::ServerError;
    let mut last_message = String::new();

    for invoker in chain {
        let spec = invoker.spec();
        info!(
            task = task.as_str(),
            model = spec.name.as_str(),
            priority = spec.priority,
            "invoking model"
        );

        match executor.run(invoker.as_ref(), payload, params).await {
            Ok(success) => {
                records.extend(success.records);
                let usage = success.response.usage;
                debug!(
                    model = spec.name.as_str(),
                    total_tokens = usage.total_tokens,
                    cost_usd = spec.cost_tier.estimate_cost(&usage),
                    "model call accounted"
                );

                if deterministic {
                    if let Err(e) = cache
                        .put(fingerprint, &success.response.text, &spec.name, usage)
                        .await
                    {
                        // The freshly computed result still goes back to the
                        // caller; only persistence failed.
                        warn!(
                            fingerprint = fingerprint.as_str(),
                            error = %e,
                            "cache write failed"
                        );
                    }
                }

                return Ok(CallResult {
                    text: success.response.text,
                    model_used: spec.name.clone(),
                    cache_hit: false,
                    attempt_count: records.len() as u32,
                    latency: started.elapsed(),
                    usage,
                });
            }
            Err(failure) => {
                records.extend(failure.records);

                if failure.kind.is_fatal() {
                    warn!(
                        model = spec.name.as_str(),
                        error_kind = failure.kind.name(),
                        "fatal failure, aborting fallback chain"
                    );
                    return Err(Error::Call(CallError::new(failure.kind, failure.message)));
                }

                warn!(
                    model = spec.name.as_str(),
                    error_kind = failure.kind.name(),
                    "model exhausted its retry budget, falling back"
                );
                terminal = failure.kind;
                last_message = failure.message;
            }
        }
    }

    error!(
        task = task.as_str(),
        attempts = records.len(),
        terminal = terminal.name(),
        last_error = last_message.as_str(),
        "all models exhausted"
    );
    Err(Error::Exhausted { records, terminal })
}
