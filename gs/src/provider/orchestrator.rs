//! ProviderOrchestrator - first-success fallback across providers
//!
//! Providers are tried strictly one at a time in registry order. The first
//! success wins; once `max_retries` providers have failed the call gives up
//! with an aggregate error listing every failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{
    CallOptions, HttpProvider, MockProvider, ProviderClient, ProviderConfig, ProviderError, ProviderRegistry,
    ProviderResult, RawPayload,
};
use crate::config::ProvidersConfig;

/// Id the automation mock registers under
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Answers are cached per prompt and per preferred provider
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    preferred: Option<String>,
    prompt: String,
}

impl CacheKey {
    fn new(prompt: &str, options: &CallOptions) -> Self {
        Self {
            preferred: options.preferred_provider.clone(),
            prompt: prompt.to_string(),
        }
    }
}

struct CachedAnswer {
    stored_at: Instant,
    payload: RawPayload,
    provider: String,
}

pub struct ProviderOrchestrator {
    registry: ProviderRegistry,
    clients: HashMap<String, Arc<dyn ProviderClient>>,
    cache: Mutex<HashMap<CacheKey, CachedAnswer>>,
    cache_ttl: Duration,
    defaults: CallOptions,
}

impl Default for ProviderOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderOrchestrator {
    /// Empty orchestrator with caching disabled
    pub fn new() -> Self {
        Self {
            registry: ProviderRegistry::default(),
            clients: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
            cache_ttl: Duration::ZERO,
            defaults: CallOptions::default(),
        }
    }

    /// Build the orchestrator described by configuration
    ///
    /// With `mock` set, only the deterministic mock provider is registered.
    pub fn from_config(config: &ProvidersConfig, mock: bool) -> Result<Self, ProviderError> {
        debug!(mock, entries = config.entries.len(), "from_config: called");
        let mut orchestrator = Self::new()
            .with_cache_ttl(Duration::from_millis(config.cache_ttl_ms))
            .with_defaults(CallOptions {
                preferred_provider: config.preferred.clone(),
                max_retries: config.max_retries,
                provider_timeout: Some(Duration::from_millis(config.request_timeout_ms)),
            });

        if mock {
            info!("from_config: mock mode, registering only the mock provider");
            orchestrator.register(
                ProviderConfig::new(MOCK_PROVIDER_ID, 0),
                Arc::new(MockProvider::canned(MOCK_PROVIDER_ID)),
            );
            return Ok(orchestrator);
        }

        let timeout = Duration::from_millis(config.request_timeout_ms);
        for entry in &config.entries {
            let client = HttpProvider::from_entry(entry, timeout)?;
            orchestrator.register(
                ProviderConfig {
                    id: entry.id.clone(),
                    enabled: entry.enabled,
                    priority: entry.priority,
                },
                Arc::new(client),
            );
        }
        Ok(orchestrator)
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_defaults(mut self, defaults: CallOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Register (or replace) a provider and its client
    pub fn register(&mut self, config: ProviderConfig, client: Arc<dyn ProviderClient>) {
        debug!(id = %config.id, priority = config.priority, "register: called");
        self.clients.insert(config.id.clone(), client);
        self.registry.upsert(config);
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn defaults(&self) -> &CallOptions {
        &self.defaults
    }

    /// Call providers with the configured default options
    pub async fn call(&self, prompt: &str) -> Result<ProviderResult, ProviderError> {
        self.call_multi(prompt, &self.defaults).await
    }

    /// Try enabled providers in order until one succeeds or `max_retries` have failed
    ///
    /// With `provider_timeout` set, a provider that has not answered in time
    /// fails with [`ProviderError::Timeout`] and the next one is tried.
    pub async fn call_multi(&self, prompt: &str, options: &CallOptions) -> Result<ProviderResult, ProviderError> {
        debug!(prompt_len = prompt.len(), ?options, "call_multi: called");

        let key = CacheKey::new(prompt, options);
        if let Some(hit) = self.cached(&key) {
            debug!(provider = %hit.provider, "call_multi: cache hit");
            return Ok(hit);
        }

        let order = self.registry.ordered(options.preferred_provider.as_deref());
        let mut failures = Vec::new();
        let mut failed_providers = Vec::new();

        for config in order {
            if failures.len() >= options.max_retries {
                debug!(failed = failures.len(), "call_multi: retry budget spent");
                break;
            }

            let outcome = match self.clients.get(&config.id) {
                Some(client) => generate_within(client.as_ref(), prompt, options.provider_timeout).await,
                None => Err(ProviderError::Unregistered(config.id.clone())),
            };

            match outcome {
                Ok(payload) => {
                    info!(provider = %config.id, failed = failed_providers.len(), "call_multi: provider succeeded");
                    debug!(provider = %config.id, answer_len = payload.to_text().len(), "call_multi: answer received");
                    self.store(key, &config.id, &payload);
                    return Ok(ProviderResult {
                        result: payload,
                        provider: config.id,
                        cached: false,
                        failed_providers,
                    });
                }
                Err(e) => {
                    warn!(
                        provider = %config.id,
                        error = %e,
                        transport = e.is_transport(),
                        payload = e.is_payload(),
                        "call_multi: provider failed"
                    );
                    failures.push(e.to_string());
                    failed_providers.push(config.id);
                }
            }
        }

        if failures.is_empty() {
            failures.push("no enabled providers".to_string());
        }
        Err(ProviderError::Exhausted { failures })
    }

    fn cached(&self, key: &CacheKey) -> Option<ProviderResult> {
        if self.cache_ttl.is_zero() {
            return None;
        }
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let fresh = cache
            .get(key)
            .is_some_and(|entry| entry.stored_at.elapsed() < self.cache_ttl);
        if !fresh {
            cache.remove(key);
            return None;
        }
        cache.get(key).map(|entry| ProviderResult {
            result: entry.payload.clone(),
            provider: entry.provider.clone(),
            cached: true,
            failed_providers: Vec::new(),
        })
    }

    /// Insert an answer, dropping every entry older than the TTL first
    fn store(&self, key: CacheKey, provider: &str, payload: &RawPayload) {
        if self.cache_ttl.is_zero() {
            return;
        }
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let before = cache.len();
        cache.retain(|_, entry| entry.stored_at.elapsed() < self.cache_ttl);
        if cache.len() < before {
            debug!(purged = before - cache.len(), "store: dropped expired answers");
        }
        cache.insert(
            key,
            CachedAnswer {
                stored_at: Instant::now(),
                payload: payload.clone(),
                provider: provider.to_string(),
            },
        );
    }
}

async fn generate_within(
    client: &dyn ProviderClient,
    prompt: &str,
    limit: Option<Duration>,
) -> Result<RawPayload, ProviderError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, client.generate(prompt))
            .await
            .unwrap_or_else(|_| Err(ProviderError::Timeout(limit))),
        None => client.generate(prompt).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockResponse;
    use serde_json::json;

    fn failing(id: &str) -> Arc<MockProvider> {
        Arc::new(MockProvider::failing(id, "unavailable"))
    }

    #[tokio::test]
    async fn test_falls_through_to_first_success() {
        let mut orch = ProviderOrchestrator::new();
        orch.register(ProviderConfig::new("perplexity", 1), failing("perplexity"));
        orch.register(ProviderConfig::new("openai", 2), failing("openai"));
        orch.register(ProviderConfig::new("mock", 3), Arc::new(MockProvider::canned("mock")));

        let result = orch.call_multi("plan", &CallOptions::default()).await.unwrap();

        assert_eq!(result.provider, "mock");
        assert_eq!(result.failed_providers, vec!["perplexity", "openai"]);
        assert!(!result.cached);
        assert!(matches!(result.result, RawPayload::Json(_)));
    }

    #[tokio::test]
    async fn test_exhausted_lists_every_failure() {
        let mut orch = ProviderOrchestrator::new();
        orch.register(ProviderConfig::new("perplexity", 1), failing("perplexity"));
        orch.register(
            ProviderConfig::new("openai", 2),
            Arc::new(MockProvider::new("openai", vec![]).with_fallback(MockResponse::Status(500))),
        );

        let err = orch.call_multi("plan", &CallOptions::default()).await.unwrap_err();
        assert_eq!(
            err.failures(),
            &["perplexity: unavailable".to_string(), "openai API error: 500".to_string()]
        );
    }

    #[tokio::test]
    async fn test_max_retries_limits_attempts() {
        let mut orch = ProviderOrchestrator::new();
        let last = Arc::new(MockProvider::canned("c"));
        orch.register(ProviderConfig::new("a", 1), failing("a"));
        orch.register(ProviderConfig::new("b", 2), failing("b"));
        orch.register(ProviderConfig::new("c", 3), last.clone());

        let options = CallOptions {
            max_retries: 2,
            ..Default::default()
        };
        let err = orch.call_multi("plan", &options).await.unwrap_err();
        assert_eq!(err.failures().len(), 2);
        assert_eq!(last.call_count(), 0);
    }

    #[tokio::test]
    async fn test_preferred_provider_tried_first() {
        let mut orch = ProviderOrchestrator::new();
        let first = Arc::new(MockProvider::canned("first"));
        let preferred = Arc::new(MockProvider::new("preferred", vec![MockResponse::text("hello")]));
        orch.register(ProviderConfig::new("first", 1), first.clone());
        orch.register(ProviderConfig::new("preferred", 9), preferred.clone());

        let options = CallOptions {
            preferred_provider: Some("preferred".to_string()),
            ..Default::default()
        };
        let result = orch.call_multi("plan", &options).await.unwrap();
        assert_eq!(result.provider, "preferred");
        assert_eq!(first.call_count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_provider_is_skipped() {
        let mut orch = ProviderOrchestrator::new();
        let skipped = Arc::new(MockProvider::canned("a"));
        orch.register(ProviderConfig::new("a", 1), skipped.clone());
        orch.register(ProviderConfig::new("b", 2), Arc::new(MockProvider::canned("b")));
        orch.registry().disable("a");

        let result = orch.call("plan").await.unwrap();
        assert_eq!(result.provider, "b");
        assert_eq!(skipped.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_providers_is_exhausted() {
        let orch = ProviderOrchestrator::new();
        let err = orch.call("plan").await.unwrap_err();
        assert!(matches!(err, ProviderError::Exhausted { .. }));
        assert_eq!(err.failures(), &["no enabled providers".to_string()]);
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_prompts() {
        let mock = Arc::new(MockProvider::new("mock", vec![MockResponse::json(json!({"tasks": []}))]));
        let mut orch = ProviderOrchestrator::new().with_cache_ttl(Duration::from_secs(60));
        orch.register(ProviderConfig::new("mock", 1), mock.clone());

        let first = orch.call("same prompt").await.unwrap();
        let second = orch.call("same prompt").await.unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.provider, "mock");
        assert_eq!(second.result, first.result);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out_and_falls_through() {
        let mut orch = ProviderOrchestrator::new();
        let slow = Arc::new(MockProvider::canned("perplexity").with_delay(Duration::from_secs(30)));
        let healthy = Arc::new(MockProvider::canned("openai"));
        orch.register(ProviderConfig::new("perplexity", 1), slow.clone());
        orch.register(ProviderConfig::new("openai", 2), healthy.clone());

        let options = CallOptions::default().with_provider_timeout(Duration::from_millis(50));
        let result = orch.call_multi("plan", &options).await.unwrap();

        assert_eq!(result.provider, "openai");
        assert_eq!(result.failed_providers, vec!["perplexity"]);
        assert_eq!(slow.call_count(), 1);
        assert_eq!(healthy.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_timeout_counts_against_retries() {
        let mut orch = ProviderOrchestrator::new();
        let last = Arc::new(MockProvider::canned("c"));
        for (id, priority) in [("a", 1), ("b", 2)] {
            orch.register(
                ProviderConfig::new(id, priority),
                Arc::new(MockProvider::canned(id).with_delay(Duration::from_secs(30))),
            );
        }
        orch.register(ProviderConfig::new("c", 3), last.clone());

        let options = CallOptions {
            max_retries: 2,
            ..Default::default()
        }
        .with_provider_timeout(Duration::from_millis(20));
        let err = orch.call_multi("plan", &options).await.unwrap_err();

        assert_eq!(err.failures(), &["Timeout after 20ms".to_string(), "Timeout after 20ms".to_string()]);
        assert_eq!(last.call_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_answers_are_dropped_on_store() {
        let mut orch = ProviderOrchestrator::new().with_cache_ttl(Duration::from_millis(20));
        orch.register(ProviderConfig::new("mock", 1), Arc::new(MockProvider::canned("mock")));

        orch.call("first").await.unwrap();
        orch.call("second").await.unwrap();
        assert_eq!(orch.cache.lock().unwrap().len(), 2);

        tokio::time::sleep(Duration::from_millis(40)).await;
        orch.call("third").await.unwrap();

        let cache = orch.cache.lock().unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.keys().all(|k| k.prompt == "third"));
    }

    #[tokio::test]
    async fn test_cache_is_keyed_by_preferred_provider() {
        let mut orch = ProviderOrchestrator::new().with_cache_ttl(Duration::from_secs(60));
        let a = Arc::new(MockProvider::new("a", vec![]).with_fallback(MockResponse::text("from a")));
        let b = Arc::new(MockProvider::new("b", vec![]).with_fallback(MockResponse::text("from b")));
        orch.register(ProviderConfig::new("a", 1), a.clone());
        orch.register(ProviderConfig::new("b", 2), b.clone());

        let first = orch.call("same prompt").await.unwrap();
        let options = CallOptions {
            preferred_provider: Some("b".to_string()),
            ..Default::default()
        };
        let preferred = orch.call_multi("same prompt", &options).await.unwrap();
        let repeat = orch.call_multi("same prompt", &options).await.unwrap();

        assert_eq!(first.provider, "a");
        assert_eq!(preferred.provider, "b");
        assert!(!preferred.cached);
        assert_eq!(preferred.result, RawPayload::Text("from b".to_string()));
        assert!(repeat.cached);
        assert_eq!(repeat.provider, "b");
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
    }

    #[tokio::test]
    async fn test_from_config_mock_mode() {
        let orch = ProviderOrchestrator::from_config(&ProvidersConfig::default(), true).unwrap();
        let ids: Vec<String> = orch.registry().entries().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![MOCK_PROVIDER_ID]);

        let result = orch.call("anything").await.unwrap();
        assert_eq!(result.provider, MOCK_PROVIDER_ID);
    }

    #[test]
    fn test_from_config_registers_entries() {
        let orch = ProviderOrchestrator::from_config(&ProvidersConfig::default(), false).unwrap();
        let ordered: Vec<String> = orch.registry().ordered(None).into_iter().map(|e| e.id).collect();
        assert_eq!(ordered, vec!["perplexity", "openai"]);
        assert_eq!(orch.defaults().max_retries, 3);
        assert_eq!(orch.defaults().provider_timeout, Some(Duration::from_millis(5_000)));
    }
}
