//! ProviderClient trait definition

use async_trait::async_trait;

use super::{ProviderError, RawPayload};

/// Stateless text-generation backend - each call is independent
///
/// Implementations make exactly one attempt per call. Retrying, ordering and
/// falling back across providers is the orchestrator's job.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Provider id this client answers for ("openai", "perplexity", "mock")
    fn id(&self) -> &str;

    /// Send one prompt and return the raw `result` payload
    async fn generate(&self, prompt: &str) -> Result<RawPayload, ProviderError>;
}
