//! Provider error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while calling text-generation providers
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} API error: {status}")]
    Api { provider: String, status: u16 },

    #[error("{provider}: {message}")]
    Remote { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Invalid payload: {0}")]
    Payload(String),

    #[error("No client registered for provider '{0}'")]
    Unregistered(String),

    #[error("All providers failed: {}", .failures.join("; "))]
    Exhausted { failures: Vec<String> },
}

impl ProviderError {
    /// Network, timeout or non-success status: the provider never answered usefully
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProviderError::Api { .. }
                | ProviderError::Remote { .. }
                | ProviderError::Network(_)
                | ProviderError::Timeout(_)
        )
    }

    /// The provider answered 2xx but the body was unusable
    pub fn is_payload(&self) -> bool {
        matches!(self, ProviderError::Payload(_))
    }

    /// Per-provider failure messages collected by an exhausted orchestrator call
    pub fn failures(&self) -> &[String] {
        match self {
            ProviderError::Exhausted { failures } => failures,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message() {
        let err = ProviderError::Api {
            provider: "openai".to_string(),
            status: 503,
        };
        assert_eq!(err.to_string(), "openai API error: 503");
    }

    #[test]
    fn test_classification() {
        assert!(ProviderError::Timeout(Duration::from_secs(5)).is_transport());
        assert!(
            ProviderError::Remote {
                provider: "perplexity".to_string(),
                message: "quota".to_string()
            }
            .is_transport()
        );
        assert!(!ProviderError::Payload("missing result".to_string()).is_transport());
        assert!(ProviderError::Payload("missing result".to_string()).is_payload());
    }

    #[test]
    fn test_exhausted_enumerates_failures() {
        let err = ProviderError::Exhausted {
            failures: vec!["perplexity API error: 500".to_string(), "openai: quota".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "All providers failed: perplexity API error: 500; openai: quota"
        );
        assert_eq!(err.failures().len(), 2);
        assert!(ProviderError::Timeout(Duration::from_secs(1)).failures().is_empty());
    }
}
