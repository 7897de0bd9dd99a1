//! Shared test doubles for orchestration tests.

use async_trait::async_trait;
use llm_relay::{
    CallError, FailureKind, InvocationParams, ModelInvoker, ModelResponse, ModelSpec, TokenUsage,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type Outcome = Result<ModelResponse, CallError>;

/// Replays a scripted prefix of outcomes, then repeats a default outcome.
/// Counts every call it receives.
pub struct FakeModel {
    spec: ModelSpec,
    script: Mutex<VecDeque<Outcome>>,
    default_outcome: Outcome,
    delay: Duration,
    calls: AtomicU32,
}

impl FakeModel {
    /// Succeeds on every call with a response naming the model.
    pub fn succeeding(name: &str, priority: u32) -> Self {
        Self {
            spec: ModelSpec::new(name, priority),
            script: Mutex::new(VecDeque::new()),
            default_outcome: Ok(response(&format!("response from {name}"))),
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
        }
    }

    /// Fails on every call with the given kind.
    pub fn failing(name: &str, priority: u32, kind: FailureKind) -> Self {
        Self {
            default_outcome: Err(CallError::new(kind, "scripted failure")),
            ..Self::succeeding(name, priority)
        }
    }

    /// Prepends outcomes consumed before the default applies.
    pub fn with_script(self, script: Vec<Outcome>) -> Self {
        *self.script.lock().unwrap() = script.into();
        self
    }

    /// Adds latency to every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelInvoker for FakeModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    async fn call(&self, _payload: &str, _params: &InvocationParams) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.default_outcome.clone())
    }
}

pub fn response(text: &str) -> ModelResponse {
    ModelResponse {
        text: text.to_string(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
    }
}

pub fn rate_limited() -> CallError {
    CallError::new(FailureKind::RateLimited, "scripted 429")
}
