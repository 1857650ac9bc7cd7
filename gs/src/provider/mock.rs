//! Deterministic, network-free provider
//!
//! Used by unit tests (scripted answers) and by automation (`mock: true` or
//! `GOALSPLIT_MOCK=1`), where it replaces every real provider without any
//! change at call sites.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{ProviderClient, ProviderError, RawPayload};

/// One scripted answer
#[derive(Debug, Clone, PartialEq)]
pub enum MockResponse {
    /// Successful `result`
    Payload(RawPayload),
    /// `{"error": message}` body
    Fail(String),
    /// Non-2xx status with no usable body
    Status(u16),
}

impl MockResponse {
    pub fn json(value: Value) -> Self {
        MockResponse::Payload(RawPayload::Json(value))
    }

    pub fn text(text: impl Into<String>) -> Self {
        MockResponse::Payload(RawPayload::Text(text.into()))
    }
}

/// Mock provider with a queue of scripted answers and an optional fallback
pub struct MockProvider {
    id: String,
    script: Mutex<VecDeque<MockResponse>>,
    fallback: Option<MockResponse>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockProvider {
    /// Scripted answers, in order; calls past the end fail
    pub fn new(id: impl Into<String>, responses: Vec<MockResponse>) -> Self {
        let id = id.into();
        debug!(%id, response_count = %responses.len(), "MockProvider::new: called");
        Self {
            id,
            script: Mutex::new(responses.into()),
            fallback: None,
            delay: None,
            prompts: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Always answers with the canned plan (tasks and habits)
    pub fn canned(id: impl Into<String>) -> Self {
        Self::new(id, vec![]).with_fallback(MockResponse::json(canned_payload()))
    }

    /// Always fails with `{"error": message}`
    pub fn failing(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(id, vec![]).with_fallback(MockResponse::Fail(message.into()))
    }

    /// Answer used once the script runs out
    pub fn with_fallback(mut self, response: MockResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Sleep before answering, to exercise deadlines
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_response(&self) -> Option<MockResponse> {
        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        scripted.or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, prompt: &str) -> Result<RawPayload, ProviderError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        debug!(id = %self.id, %idx, "MockProvider::generate: called");
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.next_response() {
            Some(MockResponse::Payload(payload)) => Ok(payload),
            Some(MockResponse::Fail(message)) => Err(ProviderError::Remote {
                provider: self.id.clone(),
                message,
            }),
            Some(MockResponse::Status(status)) => Err(ProviderError::Api {
                provider: self.id.clone(),
                status,
            }),
            None => {
                debug!(id = %self.id, "MockProvider::generate: no more mock responses");
                Err(ProviderError::Payload("No more mock responses".to_string()))
            }
        }
    }
}

/// Fixed answer served by the canned mock
pub fn canned_payload() -> Value {
    json!({
        "tasks": [
            {
                "title": "Define the desired outcome and how to measure it",
                "description": "Write down what done looks like and pick one number to track.",
                "week_estimate": 1,
                "acceptance_criteria": "A written outcome with a measurable target exists"
            },
            {
                "title": "Collect the materials and tools needed",
                "description": "List resources, book time slots and remove obvious blockers.",
                "week_estimate": 1,
                "acceptance_criteria": "Everything required is at hand"
            },
            {
                "title": "Complete the first working session",
                "description": "Do one focused session and note what slowed you down.",
                "week_estimate": 1,
                "acceptance_criteria": "One session logged with notes"
            },
            {
                "title": "Review progress at the halfway point",
                "description": "Compare results with the target and adjust the plan.",
                "week_estimate": 2,
                "acceptance_criteria": "Plan updated after the review"
            },
            {
                "title": "Finish and evaluate the final result",
                "description": "Wrap up remaining work and record lessons learned.",
                "week_estimate": 1,
                "acceptance_criteria": "Result checked against the measurable target"
            }
        ],
        "habits": [
            {
                "title": "Daily 20-minute focused session",
                "description": "Work on the goal for twenty uninterrupted minutes.",
                "frequency": "daily",
                "difficulty": "easy",
                "confidence": 0.8
            },
            {
                "title": "Weekly progress review",
                "description": "Every Sunday compare progress with the plan.",
                "frequency": "weekly",
                "difficulty": "medium",
                "confidence": 0.75
            }
        ]
    })
}
