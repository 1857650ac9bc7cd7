//! HTTP provider client
//!
//! Every provider speaks the same small contract: POST `{"prompt": ...}` to a
//! provider-specific endpoint, read `{"result": ...}` on success or
//! `{"error": "..."}` on failure.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use super::{ProviderClient, ProviderError, RawPayload};
use crate::config::ProviderEntry;

/// Provider reached over HTTP
pub struct HttpProvider {
    id: String,
    endpoint: String,
    api_key: Option<String>,
    http: Client,
}

impl HttpProvider {
    /// Create a client from a configured provider entry
    ///
    /// The API key, if any, is read from the environment variable the entry names.
    pub fn from_entry(entry: &ProviderEntry, timeout: Duration) -> Result<Self, ProviderError> {
        debug!(id = %entry.id, endpoint = %entry.endpoint, "from_entry: called");
        let api_key = entry.api_key_env.as_ref().and_then(|var| std::env::var(var).ok());
        let http = Client::builder().timeout(timeout).build().map_err(ProviderError::Network)?;

        Ok(Self {
            id: entry.id.clone(),
            endpoint: entry.endpoint.clone(),
            api_key,
            http,
        })
    }
}

#[async_trait]
impl ProviderClient for HttpProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, prompt: &str) -> Result<RawPayload, ProviderError> {
        debug!(id = %self.id, prompt_len = prompt.len(), "generate: called");
        let mut request = self
            .http
            .post(&self.endpoint)
            .header("content-type", "application/json")
            .json(&json!({ "prompt": prompt }));

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                debug!(id = %self.id, "generate: request timed out");
            }
            ProviderError::Network(e)
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text).ok();
        debug!(id = %self.id, status, has_body = body.is_some(), "generate: response received");

        classify_response(&self.id, status, body)
    }
}

/// Turn a provider HTTP answer into a payload or a failure
///
/// `result` wins on 2xx; an `error` field is a failure regardless of status;
/// any other non-2xx is `"<provider> API error: <status>"`.
pub fn classify_response(provider: &str, status: u16, body: Option<Value>) -> Result<RawPayload, ProviderError> {
    let success = (200..300).contains(&status);

    if let Some(mut body) = body {
        if let Some(message) = body.get("error").filter(|e| !e.is_null()) {
            let message = match message {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            return Err(ProviderError::Remote {
                provider: provider.to_string(),
                message,
            });
        }

        if success {
            return match body.get_mut("result").map(Value::take) {
                Some(Value::Null) | None => Err(ProviderError::Payload(format!(
                    "{} returned no result field",
                    provider
                ))),
                Some(result) => Ok(RawPayload::from_value(result)),
            };
        }
    }

    if success {
        return Err(ProviderError::Payload(format!("{} returned a non-JSON body", provider)));
    }

    Err(ProviderError::Api {
        provider: provider.to_string(),
        status,
    })
}
