use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Server-side cap on the `limit` parameter for openFDA endpoints.
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// Endpoint family root; the database segment is appended per query
    /// (e.g. `{base_url}/event.json`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Static API key, sent as the `api_key=` parameter. Falls back to the
    /// `OPENFDA_API_KEY` environment variable when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

fn default_base_url() -> String {
    "https://api.fda.gov/device".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl ApiConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENFDA_API_KEY").ok())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarvestConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Concurrent page fetches in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Additional attempts after the first, for retryable failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            concurrency: 4,
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

fn default_page_size() -> usize {
    100
}
fn default_concurrency() -> usize {
    4
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_base_ms() -> u64 {
    500
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.api.base_url.trim().is_empty() {
        anyhow::bail!("api.base_url must not be empty");
    }

    if config.harvest.page_size == 0 || config.harvest.page_size > MAX_PAGE_SIZE {
        anyhow::bail!(
            "harvest.page_size must be in 1..={} (got {})",
            MAX_PAGE_SIZE,
            config.harvest.page_size
        );
    }

    if !(1..=16).contains(&config.harvest.concurrency) {
        anyhow::bail!(
            "harvest.concurrency must be in 1..=16 (got {})",
            config.harvest.concurrency
        );
    }

    if config.api.timeout_secs == 0 {
        anyhow::bail!("api.timeout_secs must be > 0");
    }

    Ok(())
}
