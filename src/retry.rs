//! Bounded retry with exponential backoff and jitter.
//!
//! [`RetryExecutor`] drives a single [`ModelInvoker`] through at most
//! `max_attempts` attempts. Transient failures (rate limit, timeout, server
//! error) sleep and retry; fatal failures (auth, malformed request) fail
//! immediately regardless of remaining budget. The backoff sleep is the only
//! suspension point and holds no shared state.

use crate::failure::{CallError, FailureKind};
use crate::invoker::ModelInvoker;
use crate::types::{AttemptRecord, InvocationParams, ModelResponse};
use rand::Rng;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Attempts per model, including the first.
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Successful attempt sequence: the response plus the per-attempt log.
#[derive(Debug)]
pub struct RetrySuccess {
    pub response: ModelResponse,
    pub records: Vec<AttemptRecord>,
}

/// Exhausted or fatally failed attempt sequence.
#[derive(Debug, Clone)]
pub struct RetryFailure {
    pub kind: FailureKind,
    pub message: String,
    pub records: Vec<AttemptRecord>,
}

pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Runs the attempt sequence to completion against one model.
    pub async fn run(
        &self,
        invoker: &dyn ModelInvoker,
        payload: &str,
        params: &InvocationParams,
    ) -> std::result::Result<RetrySuccess, RetryFailure> {
        let model = invoker.spec().name.clone();
        let max_attempts = self.config.max_attempts.max(1);
        let mut records = Vec::new();

        for attempt in 1..=max_attempts {
            let start = Instant::now();
            let outcome = match timeout(params.timeout, invoker.call(payload, params)).await {
                Ok(result) => result,
                Err(_) => Err(CallError::new(
                    FailureKind::Timeout,
                    format!("attempt exceeded {}ms timeout", params.timeout.as_millis()),
                )),
            };
            let elapsed = start.elapsed();

            match outcome {
                Ok(response) => {
                    records.push(AttemptRecord {
                        model: model.clone(),
                        attempt,
                        error: None,
                        elapsed,
                    });
                    debug!(
                        model = model.as_str(),
                        attempt,
                        duration_ms = elapsed.as_millis() as u64,
                        "model call succeeded"
                    );
                    return Ok(RetrySuccess { response, records });
                }
                Err(err) => {
                    records.push(AttemptRecord {
                        model: model.clone(),
                        attempt,
                        error: Some(err.kind),
                        elapsed,
                    });

                    if err.kind.is_fatal() {
                        warn!(
                            model = model.as_str(),
                            attempt,
                            error_kind = err.kind.name(),
                            "fatal provider error, not retrying"
                        );
                        return Err(RetryFailure {
                            kind: err.kind,
                            message: err.message,
                            records,
                        });
                    }

                    if attempt == max_attempts {
                        warn!(
                            model = model.as_str(),
                            attempts = max_attempts,
                            error_kind = err.kind.name(),
                            "retry budget exhausted"
                        );
                        return Err(RetryFailure {
                            kind: err.kind,
                            message: err.message,
                            records,
                        });
                    }

                    let delay = self.backoff_delay(attempt);
                    debug!(
                        model = model.as_str(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error_kind = err.kind.name(),
                        "transient provider error, backing off"
                    );
                    sleep(delay).await;
                }
            }
        }

        // max_attempts >= 1, so the loop always returns.
        Err(RetryFailure {
            kind: FailureKind::ServerError,
            message: "no attempts were made".into(),
            records,
        })
    }

    /// Delay after the `attempt`-th failure (1-based):
    /// `min(base * 2^(attempt-1) + jitter, max)` with jitter uniform in
    /// `[0, base)` so concurrent callers do not retry in lockstep.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.base_backoff.as_millis() as u64;
        let cap = self.config.max_backoff.as_millis() as u64;

        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let exponential = base.saturating_mul(factor);
        let jitter = if base > 0 {
            rand::thread_rng().gen_range(0..base)
        } else {
            0
        };

        Duration::from_millis(exponential.saturating_add(jitter).min(cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::ModelSpec;
    use crate::types::TokenUsage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replays a scripted list of outcomes, then succeeds.
    struct ScriptedInvoker {
        spec: ModelSpec,
        script: Mutex<Vec<std::result::Result<ModelResponse, CallError>>>,
    }

    impl ScriptedInvoker {
        fn new(script: Vec<std::result::Result<ModelResponse, CallError>>) -> Self {
            Self {
                spec: ModelSpec::new("scripted", 1),
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait]
    impl ModelInvoker for ScriptedInvoker {
        fn spec(&self) -> &ModelSpec {
            &self.spec
        }

        async fn call(
            &self,
            _payload: &str,
            _params: &InvocationParams,
        ) -> std::result::Result<ModelResponse, CallError> {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Ok(ok_response("default"));
            }
            script.remove(0)
        }
    }

    fn ok_response(text: &str) -> ModelResponse {
        ModelResponse {
            text: text.to_string(),
            usage: TokenUsage::default(),
        }
    }

    fn rate_limited() -> CallError {
        CallError::new(FailureKind::RateLimited, "429")
    }

    fn executor(max_attempts: u32) -> RetryExecutor {
        RetryExecutor::new(RetryConfig {
            max_attempts,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(5),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn retry_bound_is_exact() {
        let invoker = ScriptedInvoker::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Err(rate_limited()),
            Ok(ok_response("never reached")),
        ]);
        let failure = executor(3)
            .run(&invoker, "payload", &InvocationParams::default())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::RateLimited);
        assert_eq!(failure.records.len(), 3);
        for (i, record) in failure.records.iter().enumerate() {
            assert_eq!(record.attempt, i as u32 + 1);
            assert_eq!(record.error, Some(FailureKind::RateLimited));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_fails_after_one_attempt() {
        let invoker = ScriptedInvoker::new(vec![Err(CallError::new(
            FailureKind::AuthFailed,
            "401",
        ))]);
        let failure = executor(5)
            .run(&invoker, "payload", &InvocationParams::default())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, FailureKind::AuthFailed);
        assert_eq!(failure.records.len(), 1);
    }

    /// Stalls past any timeout on the first call, answers instantly after.
    struct StallingInvoker {
        spec: ModelSpec,
        calls: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl ModelInvoker for StallingInvoker {
        fn spec(&self) -> &ModelSpec {
            &self.spec
        }

        async fn call(
            &self,
            _payload: &str,
            _params: &InvocationParams,
        ) -> std::result::Result<ModelResponse, CallError> {
            use std::sync::atomic::Ordering;
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(600)).await;
            }
            Ok(ok_response("eventually"))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_attempt_times_out_and_retries() {
        let invoker = StallingInvoker {
            spec: ModelSpec::new("stalling", 1),
            calls: std::sync::atomic::AtomicU32::new(0),
        };
        let params = InvocationParams::default().with_timeout(Duration::from_secs(2));

        let success = executor(3)
            .run(&invoker, "payload", &params)
            .await
            .unwrap();

        assert_eq!(success.response.text, "eventually");
        assert_eq!(success.records.len(), 2);
        assert_eq!(success.records[0].error, Some(FailureKind::Timeout));
        assert_eq!(success.records[1].error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_then_success() {
        let invoker = ScriptedInvoker::new(vec![Err(rate_limited()), Ok(ok_response("done"))]);
        let success = executor(3)
            .run(&invoker, "payload", &InvocationParams::default())
            .await
            .unwrap();

        assert_eq!(success.response.text, "done");
        assert_eq!(success.records.len(), 2);
        assert_eq!(success.records[0].error, Some(FailureKind::RateLimited));
        assert_eq!(success.records[1].error, None);
    }

    #[test]
    fn backoff_is_non_decreasing_and_capped() {
        let config = RetryConfig {
            max_attempts: 8,
            base_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(800),
        };
        let executor = RetryExecutor::new(config.clone());

        let mut previous = Duration::ZERO;
        for attempt in 1..=8 {
            let delay = executor.backoff_delay(attempt);
            assert!(delay <= config.max_backoff, "delay exceeds cap");
            assert!(delay >= previous, "delay decreased between attempts");
            // Jitter never exceeds one base interval above the exponential.
            let exponential = config.base_backoff * 2u32.pow(attempt - 1);
            assert!(delay <= (exponential + config.base_backoff).min(config.max_backoff));
            previous = delay;
        }
    }
}
