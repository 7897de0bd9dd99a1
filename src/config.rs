//! Relay configuration.
//!
//! All knobs recognized by the invocation layer, deserializable from JSON
//! with sensible defaults for every field. `Orchestrator::from_config` turns
//! one of these into a fully wired fallback chain.

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Model tried first.
    pub primary_model: String,
    /// Models tried in order after the primary is exhausted.
    pub fallback_models: Vec<String>,
    /// Maximum attempts per model, including the first.
    pub max_retries: u32,
    pub base_backoff_seconds: f64,
    pub max_backoff_seconds: f64,
    /// Per-attempt timeout.
    pub request_timeout_seconds: f64,
    pub cache_dir: PathBuf,
    pub default_cache_ttl_seconds: u64,
    pub cache_enabled: bool,
    /// OpenAI-compatible API root.
    pub base_url: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            primary_model: "gpt-4o".to_string(),
            fallback_models: vec!["gpt-4o-mini".to_string()],
            max_retries: 3,
            base_backoff_seconds: 1.0,
            max_backoff_seconds: 30.0,
            request_timeout_seconds: 30.0,
            cache_dir: PathBuf::from("llm_cache"),
            default_cache_ttl_seconds: 24 * 60 * 60,
            cache_enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl RelayConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Configuration(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| Error::Configuration(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.primary_model.is_empty() {
            return Err(Error::Configuration("primary_model is empty".into()));
        }
        if self.max_retries == 0 {
            return Err(Error::Configuration(
                "max_retries must be at least 1".into(),
            ));
        }
        if self.base_backoff_seconds < 0.0 || self.max_backoff_seconds < self.base_backoff_seconds {
            return Err(Error::Configuration(
                "backoff bounds must satisfy 0 <= base <= max".into(),
            ));
        }
        Ok(())
    }

    /// Ordered model names: primary first, then fallbacks as declared.
    pub fn model_chain(&self) -> Vec<String> {
        let mut chain = Vec::with_capacity(1 + self.fallback_models.len());
        chain.push(self.primary_model.clone());
        chain.extend(self.fallback_models.iter().cloned());
        chain
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retries,
            base_backoff: Duration::from_secs_f64(self.base_backoff_seconds),
            max_backoff: Duration::from_secs_f64(self.max_backoff_seconds),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_seconds)
    }

    pub fn default_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.default_cache_ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RelayConfig::default();
        config.validate().unwrap();
        assert_eq!(config.model_chain(), vec!["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(config.default_cache_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RelayConfig =
            serde_json::from_str(r#"{"primary_model": "gpt-4-turbo", "max_retries": 5}"#).unwrap();
        assert_eq!(config.primary_model, "gpt-4-turbo");
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.fallback_models, vec!["gpt-4o-mini"]);
        assert!(config.cache_enabled);
    }

    #[test]
    fn rejects_inverted_backoff_bounds() {
        let config = RelayConfig {
            base_backoff_seconds: 10.0,
            max_backoff_seconds: 1.0,
            ..RelayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let parsed: std::result::Result<RelayConfig, _> =
            serde_json::from_str(r#"{"primary_mode": "gpt-4o"}"#);
        assert!(parsed.is_err());
    }
}
