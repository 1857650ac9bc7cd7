//! goalsplit configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that forces the deterministic mock provider
pub const MOCK_ENV: &str = "GOALSPLIT_MOCK";

/// Main goalsplit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Register only the deterministic mock provider
    pub mock: bool,

    /// Provider registry and call options
    pub providers: ProvidersConfig,

    /// Goal splitter timing
    pub splitter: SplitterConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.providers.max_retries == 0 {
            return Err(eyre::eyre!("providers.max-retries must be at least 1"));
        }

        let mut seen = HashSet::new();
        for entry in &self.providers.entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(eyre::eyre!("Duplicate provider id '{}' in providers.entries", entry.id));
            }
        }
        Ok(())
    }

    /// Whether the mock provider should replace every real one
    pub fn mock_enabled(&self) -> bool {
        self.mock || env_flag(std::env::var(MOCK_ENV).ok().as_deref())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .goalsplit.yml
        let local_config = PathBuf::from(".goalsplit.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/goalsplit/goalsplit.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("goalsplit").join("goalsplit.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn env_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

/// Provider registry and call options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Give up after this many provider failures in one call
    #[serde(rename = "max-retries")]
    pub max_retries: usize,

    /// Response cache lifetime in milliseconds (0 disables)
    #[serde(rename = "cache-ttl-ms")]
    pub cache_ttl_ms: u64,

    /// Provider tried before the priority order
    pub preferred: Option<String>,

    /// HTTP timeout for a single provider request in milliseconds
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,

    pub entries: Vec<ProviderEntry>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            cache_ttl_ms: 300_000,
            preferred: None,
            request_timeout_ms: 5_000,
            entries: vec![
                ProviderEntry::new("perplexity", 1, "http://127.0.0.1:8787/api/perplexity"),
                ProviderEntry::new("openai", 2, "http://127.0.0.1:8787/api/openai"),
            ],
        }
    }
}

/// One configured provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub id: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Lower is tried first
    #[serde(default)]
    pub priority: i32,

    pub endpoint: String,

    /// Environment variable holding a bearer token, if the endpoint needs one
    #[serde(rename = "api-key-env", default)]
    pub api_key_env: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl ProviderEntry {
    pub fn new(id: impl Into<String>, priority: i32, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            priority,
            endpoint: endpoint.into(),
            api_key_env: None,
        }
    }
}

/// Goal splitter timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Deadline for one prompt attempt in milliseconds
    #[serde(rename = "attempt-timeout-ms")]
    pub attempt_timeout_ms: u64,

    /// Backoff before attempt n is base * 2^n
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    #[serde(rename = "backoff-cap-ms")]
    pub backoff_cap_ms: u64,

    /// Budget for all provider attempts of one split in milliseconds
    #[serde(rename = "overall-deadline-ms")]
    pub overall_deadline_ms: u64,

    /// Ask a provider to expand a short list before expanding locally
    #[serde(rename = "expand-via-provider")]
    pub expand_via_provider: bool,

    /// Treat a single task whose title appears inside the goal as an echo,
    /// not only an exact repeat
    #[serde(rename = "echo-substring")]
    pub echo_substring: bool,

    /// Also treat a title that wraps the whole goal ("Goal: <goal>") as an echo
    #[serde(rename = "echo-wrapped")]
    pub echo_wrapped: bool,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: 5_000,
            backoff_base_ms: 200,
            backoff_cap_ms: 1_000,
            overall_deadline_ms: 45_000,
            expand_via_provider: true,
            echo_substring: true,
            echo_wrapped: false,
        }
    }
}

impl SplitterConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn overall_deadline(&self) -> Duration {
        Duration::from_millis(self.overall_deadline_ms)
    }

    /// Delay before retry number `attempt` (0-based), capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor).min(self.backoff_cap_ms))
    }
}
