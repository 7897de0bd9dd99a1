//! HTTP-backed model invoker for OpenAI-compatible chat completion APIs.

use super::{ModelInvoker, ModelSpec};
use crate::error::{Error, Result};
use crate::failure::{CallError, FailureKind};
use crate::types::{InvocationParams, ModelResponse, TokenUsage};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

/// Maximum error body length carried into diagnostics.
const MAX_ERROR_BODY: usize = 512;

pub struct HttpInvoker {
    spec: ModelSpec,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpInvoker {
    /// Builds an invoker for one model identity. The API key is taken from
    /// `OPENAI_API_KEY` unless overridden with [`with_api_key`].
    ///
    /// [`with_api_key`]: HttpInvoker::with_api_key
    pub fn new(name: impl Into<String>, priority: u32, base_url: impl Into<String>) -> Result<Self> {
        // No client-wide timeout; each attempt carries its own.
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("http client: {}", e)))?;
        Ok(Self {
            spec: ModelSpec::new(name, priority),
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Default)]
struct UsageBody {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[async_trait]
impl ModelInvoker for HttpInvoker {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    async fn call(
        &self,
        payload: &str,
        params: &InvocationParams,
    ) -> std::result::Result<ModelResponse, CallError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.spec.name,
            "messages": [{"role": "user", "content": payload}],
            "temperature": params.temperature,
            "max_tokens": params.max_output_tokens,
        });

        let mut request = self
            .client
            .post(&url)
            .json(&body)
            .timeout(params.timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                CallError::new(FailureKind::Timeout, format!("request timed out: {}", e))
            } else {
                CallError::new(FailureKind::ServerError, format!("connection failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            let kind = FailureKind::from_http_status(status);
            debug!(
                model = self.spec.name.as_str(),
                http_status = status,
                error_kind = kind.name(),
                "provider call failed"
            );
            return Err(CallError::new(kind, truncate(&body)));
        }

        let completion: ChatCompletion = response.json().await.map_err(|e| {
            CallError::new(
                FailureKind::ServerError,
                format!("unparseable provider response: {}", e),
            )
        })?;

        let choice = completion.choices.into_iter().next().ok_or_else(|| {
            CallError::new(FailureKind::ServerError, "response contained no choices")
        })?;
        let usage = completion.usage.unwrap_or_default();

        Ok(ModelResponse {
            text: choice.message.content,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
        })
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        body.to_string()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(i, _)| *i < MAX_ERROR_BODY)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &body[..cut])
    }
}
