//! Provider request/response types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Raw result returned by a provider before any parsing
///
/// Providers answer with either structured JSON or free text; the parser
/// chain consumes both.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    Json(Value),
    Text(String),
}

impl RawPayload {
    /// Classify a provider `result` field: strings are text, everything else JSON
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(text) => RawPayload::Text(text),
            other => RawPayload::Json(other),
        }
    }

    /// Render the payload as a string (JSON is stringified)
    pub fn to_text(&self) -> String {
        match self {
            RawPayload::Json(value) => value.to_string(),
            RawPayload::Text(text) => text.clone(),
        }
    }
}

/// Registry entry for one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub enabled: bool,
    /// Lower is tried first
    pub priority: i32,
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            priority,
        }
    }
}

/// Per-call options for the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Provider to try before the priority order
    pub preferred_provider: Option<String>,
    /// Stop once this many providers have failed
    pub max_retries: usize,
    /// Bound on a single provider call; elapsing counts as that provider failing
    pub provider_timeout: Option<Duration>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            preferred_provider: None,
            max_retries: 3,
            provider_timeout: None,
        }
    }
}

impl CallOptions {
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = Some(timeout);
        self
    }

    /// Longest a full fallback chain can take when every provider times out
    pub fn chain_budget(&self) -> Option<Duration> {
        let attempts = u32::try_from(self.max_retries.max(1)).unwrap_or(u32::MAX);
        self.provider_timeout.map(|t| t.saturating_mul(attempts))
    }
}

/// First successful provider answer
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult {
    pub result: RawPayload,
    pub provider: String,
    /// Served from the orchestrator's response cache
    pub cached: bool,
    /// Ids of providers that failed before this one answered
    pub failed_providers: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_splits_text_and_json() {
        assert_eq!(
            RawPayload::from_value(json!("1. Read")),
            RawPayload::Text("1. Read".to_string())
        );
        assert_eq!(
            RawPayload::from_value(json!({"tasks": []})),
            RawPayload::Json(json!({"tasks": []}))
        );
    }

    #[test]
    fn test_to_text_stringifies_json() {
        let payload = RawPayload::Json(json!({"a": 1}));
        assert_eq!(payload.to_text(), r#"{"a":1}"#);
    }

    #[test]
    fn test_call_options_default() {
        let opts = CallOptions::default();
        assert_eq!(opts.max_retries, 3);
        assert!(opts.preferred_provider.is_none());
        assert!(opts.provider_timeout.is_none());
        assert!(opts.chain_budget().is_none());
    }

    #[test]
    fn test_chain_budget_covers_every_retry() {
        let opts = CallOptions::default().with_provider_timeout(Duration::from_millis(100));
        assert_eq!(opts.chain_budget(), Some(Duration::from_millis(300)));

        let opts = CallOptions {
            max_retries: 0,
            ..opts
        };
        assert_eq!(opts.chain_budget(), Some(Duration::from_millis(100)));
    }
}
