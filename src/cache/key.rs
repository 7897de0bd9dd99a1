//! Request fingerprinting.
//!
//! A fingerprint is a SHA-256 hex digest over the canonical JSON of the
//! request's identity: task, whitespace-normalized text, and the
//! model-invocation parameters that affect the output. Two requests with the
//! same fingerprint are interchangeable for caching purposes.

use crate::types::{InvocationParams, Task};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(task: Task, text: &str, params: &InvocationParams) -> Self {
        // BTreeMap keeps field order stable across releases.
        let mut parts: BTreeMap<&'static str, String> = BTreeMap::new();
        parts.insert("task", task.as_str().to_string());
        parts.insert("text", normalize(text));
        parts.insert("temperature", format!("{:.2}", params.temperature));
        parts.insert("max_output_tokens", params.max_output_tokens.to_string());

        let canonical = serde_json::to_string(&parts).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collapse runs of whitespace and trim, so trivially reformatted copies of
/// the same document fingerprint identically.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_requests_share_a_fingerprint() {
        let params = InvocationParams::default();
        let a = Fingerprint::compute(Task::Classify, "hello world", &params);
        let b = Fingerprint::compute(Task::Classify, "hello world", &params);
        assert_eq!(a, b);
    }

    #[test]
    fn whitespace_variants_normalize() {
        let params = InvocationParams::default();
        let a = Fingerprint::compute(Task::Summarize, "  hello\n\tworld ", &params);
        let b = Fingerprint::compute(Task::Summarize, "hello world", &params);
        assert_eq!(a, b);
    }

    #[test]
    fn task_and_parameters_discriminate() {
        let params = InvocationParams::default();
        let base = Fingerprint::compute(Task::Classify, "hello", &params);

        let other_task = Fingerprint::compute(Task::Summarize, "hello", &params);
        assert_ne!(base, other_task);

        let hotter = params.clone().with_temperature(0.7);
        let other_temp = Fingerprint::compute(Task::Classify, "hello", &hotter);
        assert_ne!(base, other_temp);

        let longer = params.with_max_output_tokens(2048);
        let other_len = Fingerprint::compute(Task::Classify, "hello", &longer);
        assert_ne!(base, other_len);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = Fingerprint::compute(
            Task::Classify,
            "hello",
            &InvocationParams::default(),
        );
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
