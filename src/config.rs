use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::core::AggregatorConfig;
use crate::services::RegionDefinition;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub aggregation: AggregationSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub regions: Vec<RegionSettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationSettings {
    #[serde(default = "default_max_parallel_regions")]
    pub max_parallel_regions: usize,
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub caching_enabled: bool,
    /// Reserved for fuzzy name matching; exact normalized matching ignores it
    #[serde(default = "default_similarity_threshold")]
    pub dedup_similarity_threshold: f64,
    #[serde(default = "default_region")]
    pub default_region: String,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            max_parallel_regions: default_max_parallel_regions(),
            default_timeout_ms: default_timeout_ms(),
            caching_enabled: default_true(),
            dedup_similarity_threshold: default_similarity_threshold(),
            default_region: default_region(),
        }
    }
}

fn default_max_parallel_regions() -> usize { 3 }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_true() -> bool { true }
fn default_similarity_threshold() -> f64 { 0.85 }
fn default_region() -> String { "global".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: Option<String>,
    #[serde(default = "default_l1_cache_size")]
    pub l1_cache_size: u64,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            l1_cache_size: default_l1_cache_size(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_l1_cache_size() -> u64 { 1000 }
fn default_ttl_secs() -> u64 { 300 }

/// A region definition plus the endpoint of its search backend
#[derive(Debug, Clone, Deserialize)]
pub struct RegionSettings {
    pub endpoint: String,
    #[serde(flatten)]
    pub definition: RegionDefinition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with REGION_SEARCH)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., REGION_SEARCH__AGGREGATION__DEFAULT_TIMEOUT_MS -> aggregation.default_timeout_ms
            .add_source(
                Environment::with_prefix("REGION_SEARCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("REGION_SEARCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Read-only engine configuration
    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            max_parallel_regions: self.aggregation.max_parallel_regions,
            default_timeout_ms: self.aggregation.default_timeout_ms,
            caching_enabled: self.aggregation.caching_enabled,
            cache_ttl_secs: self.cache.ttl_secs,
            dedup_similarity_threshold: self.aggregation.dedup_similarity_threshold,
            default_region: self.aggregation.default_region.clone(),
        }
    }

    pub fn region_definitions(&self) -> Vec<RegionDefinition> {
        self.regions.iter().map(|r| r.definition.clone()).collect()
    }

    pub fn region_endpoints(&self) -> HashMap<String, String> {
        self.regions
            .iter()
            .map(|r| (r.definition.id.clone(), r.endpoint.clone()))
            .collect()
    }
}

/// Apply well-known unprefixed environment overrides
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Ok(redis_url) = std::env::var("REDIS_URL") {
        builder = builder.set_override("cache.redis_url", redis_url)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_aggregation_settings() {
        let settings = AggregationSettings::default();
        assert_eq!(settings.max_parallel_regions, 3);
        assert_eq!(settings.default_timeout_ms, 10_000);
        assert!(settings.caching_enabled);
        assert_eq!(settings.dedup_similarity_threshold, 0.85);
    }

    #[test]
    fn test_default_logging() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "json");
    }

    #[test]
    fn test_region_settings_from_toml() {
        let raw = r#"
            id = "apac-north"
            name = "APAC North"
            endpoint = "https://apac-north.internal"
            countries = ["VN", "CN"]
            destinations = ["Hanoi"]
            center = [21.0285, 105.8542]
            radius_km = 500.0
            priority = 2.0
        "#;

        let region: RegionSettings = toml::from_str(raw).unwrap();
        assert_eq!(region.endpoint, "https://apac-north.internal");
        assert_eq!(region.definition.id, "apac-north");
        assert!(region.definition.healthy);
        assert!(region.definition.coverage().is_some());
    }

    #[test]
    fn test_aggregator_config_view() {
        let settings = Settings {
            aggregation: AggregationSettings::default(),
            cache: CacheSettings::default(),
            regions: vec![],
            logging: LoggingSettings::default(),
        };

        let config = settings.aggregator_config();
        assert_eq!(config.max_parallel_regions, 3);
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.default_region, "global");
    }
}
