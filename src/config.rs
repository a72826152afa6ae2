use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::models::ScoringWeights;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub vk: VkSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VkSettings {
    #[serde(default = "default_vk_base_url")]
    pub base_url: String,
    pub access_token: String,
    #[serde(default = "default_vk_api_version")]
    pub api_version: String,
    pub timeout_secs: Option<u64>,
    /// Minimum spacing between API calls; VK allows about three per second
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_vk_base_url() -> String { "https://api.vk.com/method".to_string() }
fn default_vk_api_version() -> String { "5.131".to_string() }
fn default_min_interval_ms() -> u64 { 340 }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// Shared L2 tier; the service runs on the in-process tier alone without it
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_result_cap")]
    pub result_cap: usize,
    /// Searched ages are seed age ± this many years
    #[serde(default = "default_age_range")]
    pub age_range: u32,
    #[serde(default = "default_min_age")]
    pub min_age: u32,
    #[serde(default = "default_max_age")]
    pub max_age: u32,
    /// VK marital status codes searched one after another
    #[serde(default = "default_search_statuses")]
    pub search_statuses: Vec<u8>,
    #[serde(default = "default_pages_per_status")]
    pub pages_per_status: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_photos")]
    pub max_photos: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            result_cap: default_result_cap(),
            age_range: default_age_range(),
            min_age: default_min_age(),
            max_age: default_max_age(),
            search_statuses: default_search_statuses(),
            pages_per_status: default_pages_per_status(),
            page_size: default_page_size(),
            max_photos: default_max_photos(),
        }
    }
}

fn default_result_cap() -> usize { 100 }
fn default_age_range() -> u32 { 5 }
fn default_min_age() -> u32 { 18 }
fn default_max_age() -> u32 { 100 }
fn default_search_statuses() -> Vec<u8> { vec![1, 6] }
fn default_pages_per_status() -> u32 { 1 }
fn default_page_size() -> u32 { 100 }
fn default_max_photos() -> usize { 3 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_age_weight")]
    pub age: f64,
    #[serde(default = "default_city_weight")]
    pub city: f64,
    #[serde(default = "default_interests_weight")]
    pub interests: f64,
    #[serde(default = "default_music_weight")]
    pub music: f64,
    #[serde(default = "default_books_weight")]
    pub books: f64,
    #[serde(default = "default_groups_weight")]
    pub groups: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            age: default_age_weight(),
            city: default_city_weight(),
            interests: default_interests_weight(),
            music: default_music_weight(),
            books: default_books_weight(),
            groups: default_groups_weight(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        Self {
            age: config.age,
            city: config.city,
            interests: config.interests,
            music: config.music,
            books: config.books,
            groups: config.groups,
        }
    }
}

fn default_age_weight() -> f64 { 0.3 }
fn default_city_weight() -> f64 { 0.2 }
fn default_interests_weight() -> f64 { 0.2 }
fn default_music_weight() -> f64 { 0.1 }
fn default_books_weight() -> f64 { 0.1 }
fn default_groups_weight() -> f64 { 0.1 }

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
    /// 4. Environment variables (prefixed with VKMATCH__)
    /// 5. `DATABASE_URL` and `VK_ACCESS_TOKEN`
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., VKMATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("VKMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        apply_well_known_env(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("VKMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights::from(&self.scoring.weights)
    }
}

/// Let the conventional unprefixed variables win over file values
fn apply_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }
    if let Ok(token) = env::var("VK_ACCESS_TOKEN") {
        builder = builder.set_override("vk.access_token", token)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_weights() {
        let weights = WeightsConfig::default();
        assert_eq!(weights.age, 0.3);
        assert_eq!(weights.city, 0.2);
        assert_eq!(weights.interests, 0.2);
        assert_eq!(weights.music, 0.1);
        assert_eq!(weights.books, 0.1);
        assert_eq!(weights.groups, 0.1);
        assert_eq!(ScoringWeights::from(&weights), ScoringWeights::default());
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_minimal_file_fills_defaults() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 8080

            [vk]
            access_token = "token"

            [database]
            url = "postgres://localhost/vk_matchmaker"

            [scoring.weights]
            music = 0.0
        "#;

        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.vk.api_version, "5.131");
        assert_eq!(settings.vk.min_interval_ms, 340);
        assert_eq!(settings.matching.result_cap, 100);
        assert_eq!(settings.matching.search_statuses, vec![1, 6]);
        assert!(settings.cache.redis_url.is_none());
        assert_eq!(settings.scoring_weights().music, 0.0);
        assert_eq!(settings.scoring_weights().age, 0.3);
    }
}
