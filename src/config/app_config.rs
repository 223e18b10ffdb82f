use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::{DedupeThreshold, DomainError};
use crate::infrastructure::storage::PostgresConfig;

/// Environment variable prefix, e.g. `SEEDBANK__SEEDS__DEDUP_THRESHOLD`
pub const ENV_PREFIX: &str = "SEEDBANK";

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub embedding: EmbeddingConfig,
    pub seeds: SeedsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// OpenAI-compatible embedding endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeedsConfig {
    /// Similarity at or above which a new seed merges into its nearest neighbor; 0 disables
    pub dedup_threshold: f64,
    /// Maximum number of cached embeddings
    pub cache_size: usize,
    /// Run dedupe decide-then-write one store at a time
    pub serialize_writes: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let postgres = PostgresConfig::default();

        Self {
            url: postgres.url,
            max_connections: postgres.max_connections,
            min_connections: postgres.min_connections,
            connect_timeout_secs: postgres.connect_timeout_secs,
            idle_timeout_secs: postgres.idle_timeout_secs,
        }
    }
}

impl DatabaseConfig {
    pub fn to_postgres_config(&self) -> PostgresConfig {
        PostgresConfig::new(&self.url)
            .with_max_connections(self.max_connections)
            .with_min_connections(self.min_connections)
            .with_connect_timeout(self.connect_timeout_secs)
            .with_idle_timeout(self.idle_timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "gte-small".to_string(),
            api_key: None,
            dimensions: 384,
            timeout_secs: 30,
        }
    }
}

impl Default for SeedsConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: 0.0,
            cache_size: 256,
            serialize_writes: true,
        }
    }
}

impl SeedsConfig {
    pub fn dedupe_threshold(&self) -> Result<DedupeThreshold, DomainError> {
        DedupeThreshold::new(self.dedup_threshold)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local` and `SEEDBANK__*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            config::Config::builder()
                .add_source(File::with_name("config/default").required(false))
                .add_source(File::with_name("config/local").required(false))
                .add_source(
                    Environment::with_prefix(ENV_PREFIX)
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// Reject values the services cannot run with
    pub fn validate(&self) -> Result<(), DomainError> {
        self.seeds.dedupe_threshold()?;

        if self.seeds.cache_size == 0 {
            return Err(DomainError::configuration("seeds.cache_size must be at least 1"));
        }

        if self.embedding.dimensions == 0 {
            return Err(DomainError::configuration("embedding.dimensions must be at least 1"));
        }

        if self.embedding.base_url.trim().is_empty() {
            return Err(DomainError::configuration("embedding.base_url must not be empty"));
        }

        Ok(())
    }
}
