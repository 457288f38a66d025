/*!
common/src/lib.rs

Shared configuration types for Polinews.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file
- A loader merging a defaults file with an optional override file
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Aggregation pipeline tuning
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Freshness window used when the caller does not pass one
    pub default_hours: Option<u32>,
    /// Maximum share of the result set a single source may hold (0.0 - 1.0)
    pub diversity_cap: Option<f64>,
    /// Target size of the returned article set
    pub max_articles: Option<usize>,
    /// Coverage target: distinct sources we hope to see in the result
    pub min_sources_represented: Option<usize>,
    /// Timeout applied to each provider call as a whole
    pub provider_timeout_seconds: Option<u64>,
}

/// Settings for a single news provider.
///
/// The API key itself never lives in the config file: `api_key_env` names the
/// environment variable holding it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub enabled: Option<bool>,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub priority: Option<i32>,
    pub page_size: Option<u32>,
    /// Minimum delay between two requests to this provider
    pub min_interval_ms: Option<u64>,
    pub language: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
}

/// Per-provider sections: `[providers.newsapi]`, `[providers.gnews]`, ...
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub newsapi: Option<ProviderConfig>,
    pub gnews: Option<ProviderConfig>,
    pub mediastack: Option<ProviderConfig>,
    pub newsdata: Option<ProviderConfig>,
}

/// Bias scoring and reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Optional TOML file replacing the built-in lexicon and credibility tables
    pub reference_path: Option<String>,
    /// How many sources to list in the most/least credible rankings
    pub report_top_k: Option<usize>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for (label, path) in [("default", default_path), ("override", override_path)] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {} config: {}", label, path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse {} configuration", label))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
