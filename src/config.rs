use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::categorizer::KeywordTables;
use crate::registry::FeedSource;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Background warm-up interval in minutes; 0 disables it
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub keywords: KeywordTables,
    pub feeds: Vec<FeedSource>,
}

fn default_refresh_interval() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Include internal error detail in 500 responses
    #[serde(default)]
    pub development: bool,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            development: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: u64,
}

fn default_ttl_minutes() -> u64 {
    15
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes * 60)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Number of feeds fetched concurrently per batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Article pool size used for trending topics
    #[serde(default = "default_trending_pool")]
    pub trending_pool: usize,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_concurrency() -> usize {
    3
}

fn default_user_agent() -> String {
    "SportsNews/1.0 (RSS Aggregator)".to_string()
}

fn default_trending_pool() -> usize {
    100
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
            trending_pool: default_trending_pool(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NormalizeConfig {
    /// Maximum description length in characters; 0 disables truncation
    #[serde(default = "default_description_limit")]
    pub description_limit: usize,
}

fn default_description_limit() -> usize {
    300
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            description_limit: default_description_limit(),
        }
    }
}

impl NormalizeConfig {
    pub fn limit(&self) -> Option<usize> {
        (self.description_limit > 0).then_some(self.description_limit)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
