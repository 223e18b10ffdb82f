//! Seedbank
//!
//! Stores short text "seeds" with vector embeddings and agent contexts:
//! - Bounded LRU cache in front of an OpenAI-compatible embedding endpoint
//! - Semantic deduplication (merge near-duplicates instead of inserting)
//! - Filtered similarity search and chronological listing over PostgreSQL/pgvector

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod state;

pub use config::AppConfig;
pub use state::{AppState, Stats};

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use domain::{ContextRepository, DedupeDecider, DomainError, EmbeddingProvider, VectorStore};
use infrastructure::{
    context::PostgresContextRepository,
    embedding::{EmbeddingCache, HttpClient, OpenAiEmbeddingProvider},
    seed::PgvectorSeedStore,
    services::{ContextService, SeedService},
    storage,
};
use tracing::info;

/// Create the application state backed by PostgreSQL and the configured embedding endpoint
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    config.validate()?;

    let provider = create_embedding_provider(config)?;

    let pool = storage::connect(&config.database.to_postgres_config()).await?;
    info!("PostgreSQL connection established");

    let seed_store = PgvectorSeedStore::new(pool.clone(), config.embedding.dimensions);
    seed_store.ensure_schema().await?;

    let context_repository = PostgresContextRepository::new(pool);
    context_repository.ensure_schema().await?;

    Ok(build_app_state(
        config,
        provider,
        Arc::new(seed_store),
        Arc::new(context_repository),
    )?)
}

/// Create the HTTP embedding provider from configuration
pub fn create_embedding_provider(
    config: &AppConfig,
) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
    let embedding = &config.embedding;
    let client = HttpClient::with_timeout(Duration::from_secs(embedding.timeout_secs))?;

    info!(
        base_url = %embedding.base_url,
        model = %embedding.model,
        dimensions = embedding.dimensions,
        "Using OpenAI-compatible embedding provider"
    );

    Ok(Arc::new(
        OpenAiEmbeddingProvider::new(
            client,
            &embedding.base_url,
            &embedding.model,
            embedding.dimensions,
        )
        .with_api_key(embedding.api_key.clone()),
    ))
}

/// Wire services over the given provider and stores
pub fn build_app_state(
    config: &AppConfig,
    provider: Arc<dyn EmbeddingProvider>,
    seed_store: Arc<dyn VectorStore>,
    context_repository: Arc<dyn ContextRepository>,
) -> Result<AppState, DomainError> {
    let threshold = config.seeds.dedupe_threshold()?;
    let capacity = NonZeroUsize::new(config.seeds.cache_size)
        .ok_or_else(|| DomainError::configuration("seeds.cache_size must be at least 1"))?;

    info!(
        store = seed_store.store_type(),
        dedup_threshold = threshold.value(),
        cache_size = capacity.get(),
        serialize_writes = config.seeds.serialize_writes,
        "Seed service configured"
    );

    let embeddings = Arc::new(EmbeddingCache::new(provider, capacity));
    let seeds = SeedService::new(embeddings, seed_store, DedupeDecider::new(threshold))
        .with_serialized_writes(config.seeds.serialize_writes);
    let contexts = ContextService::new(context_repository);

    Ok(AppState::new(Arc::new(seeds), Arc::new(contexts)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::infrastructure::context::InMemoryContextRepository;
    use crate::infrastructure::seed::InMemoryVectorStore;
    use crate::infrastructure::services::{CreateContextRequest, StoreSeedRequest};

    fn in_memory_state(config: &AppConfig) -> AppState {
        build_app_state(
            config,
            Arc::new(MockEmbeddingProvider::new("test", 8)),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(InMemoryContextRepository::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_stats_counts_both_tables() {
        let state = in_memory_state(&AppConfig::default());

        state
            .seeds
            .store(StoreSeedRequest::new("hello"))
            .await
            .unwrap();
        state
            .contexts
            .create(CreateContextRequest {
                agent_id: "agent".to_string(),
                memory_type: "working".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let stats = state.stats().await.unwrap();

        assert_eq!(stats, Stats { seeds: 1, agent_contexts: 1 });
        assert_eq!(
            serde_json::to_value(stats).unwrap(),
            json!({"seeds": 1, "agent_contexts": 1})
        );
        assert!(state.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_configured_threshold_enables_dedupe() {
        let mut config = AppConfig::default();
        config.seeds.dedup_threshold = 0.95;
        let state = in_memory_state(&config);

        state.seeds.store(StoreSeedRequest::new("same")).await.unwrap();
        state.seeds.store(StoreSeedRequest::new("same")).await.unwrap();

        assert_eq!(state.stats().await.unwrap().seeds, 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.seeds.cache_size = 0;

        let result = build_app_state(
            &config,
            Arc::new(MockEmbeddingProvider::new("test", 8)),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(InMemoryContextRepository::new()),
        );

        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
