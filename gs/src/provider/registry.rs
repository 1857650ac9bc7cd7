//! Ordered, lock-guarded provider registry
//!
//! Owned by a `ProviderOrchestrator` instance rather than living in a global,
//! so tests and concurrent callers each get their own view.

use std::sync::RwLock;
use tracing::debug;

use super::ProviderConfig;

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    entries: RwLock<Vec<ProviderConfig>>,
}

impl ProviderRegistry {
    pub fn new(entries: Vec<ProviderConfig>) -> Self {
        debug!(count = entries.len(), "ProviderRegistry::new: called");
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Add a provider, replacing any existing entry with the same id
    pub fn upsert(&self, config: ProviderConfig) {
        debug!(id = %config.id, "upsert: called");
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|e| e.id == config.id) {
            Some(existing) => *existing = config,
            None => entries.push(config),
        }
    }

    /// Enable a provider; returns false if the id is unknown
    pub fn enable(&self, id: &str) -> bool {
        self.set_enabled(id, true)
    }

    /// Disable a provider; returns false if the id is unknown
    pub fn disable(&self, id: &str) -> bool {
        self.set_enabled(id, false)
    }

    pub fn set_priority(&self, id: &str, priority: i32) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.priority = priority;
                true
            }
            None => false,
        }
    }

    fn set_enabled(&self, id: &str, enabled: bool) -> bool {
        debug!(%id, enabled, "set_enabled: called");
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => {
                debug!(%id, "set_enabled: unknown provider");
                false
            }
        }
    }

    /// Snapshot of every entry, in registration order
    pub fn entries(&self) -> Vec<ProviderConfig> {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Enabled providers in call order: preferred first, then ascending priority
    ///
    /// Ties keep registration order.
    pub fn ordered(&self, preferred: Option<&str>) -> Vec<ProviderConfig> {
        let mut enabled: Vec<ProviderConfig> = self.entries().into_iter().filter(|e| e.enabled).collect();
        enabled.sort_by_key(|e| (Some(e.id.as_str()) != preferred, e.priority));
        debug!(order = ?enabled.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), "ordered: resolved");
        enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(vec![
            ProviderConfig::new("openai", 2),
            ProviderConfig::new("perplexity", 1),
            ProviderConfig::new("mock", 3),
        ])
    }

    fn ids(entries: &[ProviderConfig]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_ordered_by_priority() {
        let reg = registry();
        assert_eq!(ids(&reg.ordered(None)), vec!["perplexity", "openai", "mock"]);
    }

    #[test]
    fn test_preferred_goes_first() {
        let reg = registry();
        assert_eq!(ids(&reg.ordered(Some("mock"))), vec!["mock", "perplexity", "openai"]);
    }

    #[test]
    fn test_unknown_preferred_is_ignored() {
        let reg = registry();
        assert_eq!(ids(&reg.ordered(Some("gemini"))), vec!["perplexity", "openai", "mock"]);
    }

    #[test]
    fn test_disable_and_enable() {
        let reg = registry();
        assert!(reg.disable("perplexity"));
        assert_eq!(ids(&reg.ordered(None)), vec!["openai", "mock"]);

        assert!(reg.enable("perplexity"));
        assert_eq!(ids(&reg.ordered(None)), vec!["perplexity", "openai", "mock"]);

        assert!(!reg.disable("gemini"));
    }

    #[test]
    fn test_disabled_preferred_is_skipped() {
        let reg = registry();
        reg.disable("mock");
        assert_eq!(ids(&reg.ordered(Some("mock"))), vec!["perplexity", "openai"]);
    }

    #[test]
    fn test_set_priority_and_upsert() {
        let reg = registry();
        assert!(reg.set_priority("mock", 0));
        assert_eq!(ids(&reg.ordered(None))[0], "mock");

        reg.upsert(ProviderConfig::new("gemini", -1));
        reg.upsert(ProviderConfig::new("openai", 10));
        assert_eq!(ids(&reg.ordered(None)), vec!["gemini", "mock", "perplexity", "openai"]);
        assert_eq!(reg.entries().len(), 4);
    }
}
