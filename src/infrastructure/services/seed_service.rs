//! Seed service - store, dedupe, search and maintain seeds

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};

use crate::domain::seed::{
    metadata_from_value, resolve_limit, resolve_threshold, DEFAULT_QUERY_LIMIT,
    DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT, UPDATE_COUNT_KEY,
};
use crate::domain::{
    DedupeDecider, DedupeDecision, DomainError, Metadata, NewSeed, RecentQuery, Scope,
    SearchQuery, Seed, SeedId, SeedSearch, StoreOutcome, VectorStore,
};
use crate::infrastructure::embedding::EmbeddingCache;

/// Request to store a seed
#[derive(Debug, Clone, Default)]
pub struct StoreSeedRequest {
    pub content: String,
    /// Must be a JSON object when present
    pub metadata: Option<Value>,
    pub scope: Scope,
}

impl StoreSeedRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// Request for a similarity search
#[derive(Debug, Clone, Default)]
pub struct SearchSeedsRequest {
    pub query: String,
    /// Non-positive or absent uses the operation's default; `query` caps it at 100
    pub limit: Option<i64>,
    /// Negative or absent means no threshold
    pub threshold: Option<f64>,
    pub seed_ids: Vec<SeedId>,
    pub scope: Scope,
}

impl SearchSeedsRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_seed_ids(mut self, seed_ids: Vec<SeedId>) -> Self {
        self.seed_ids = seed_ids;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// Seed operations on top of the embedding cache and a vector store.
///
/// Storing runs decide-then-write: probe the nearest row, then either refresh it
/// (`Updated`) or insert (`Inserted`). With dedupe enabled and write serialization on,
/// that sequence is exclusive within this service instance.
pub struct SeedService {
    embeddings: Arc<EmbeddingCache>,
    store: Arc<dyn VectorStore>,
    decider: DedupeDecider,
    search: SeedSearch,
    write_lock: Option<Mutex<()>>,
}

impl std::fmt::Debug for SeedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedService")
            .field("store", &self.store.store_type())
            .field("decider", &self.decider)
            .field("serialized_writes", &self.write_lock.is_some())
            .finish()
    }
}

impl SeedService {
    /// Create a service with write serialization enabled
    pub fn new(
        embeddings: Arc<EmbeddingCache>,
        store: Arc<dyn VectorStore>,
        decider: DedupeDecider,
    ) -> Self {
        Self {
            search: SeedSearch::new(Arc::clone(&store)),
            embeddings,
            store,
            decider,
            write_lock: None,
        }
        .with_serialized_writes(true)
    }

    /// Serialize decide-then-write; has no effect while dedupe is disabled
    pub fn with_serialized_writes(mut self, enabled: bool) -> Self {
        self.write_lock = (enabled && self.decider.threshold().is_enabled()).then(|| Mutex::new(()));
        self
    }

    pub fn embeddings(&self) -> &Arc<EmbeddingCache> {
        &self.embeddings
    }

    /// Embed and store a seed, merging into a near-duplicate when dedupe is enabled
    pub async fn store(&self, request: StoreSeedRequest) -> Result<StoreOutcome, DomainError> {
        validate_content(&request.content)?;
        let metadata = metadata_from_value(request.metadata)?;

        let embedding = self.embeddings.get(&request.content).await?;

        let _guard = self.write_guard().await;
        let decision = self.decider.decide(self.store.as_ref(), &embedding).await?;

        let new_seed = NewSeed::new(request.content, embedding.to_vec())
            .with_metadata(metadata)
            .with_scope(request.scope);

        match decision {
            DedupeDecision::InsertNew => self.insert(new_seed).await,
            DedupeDecision::UpsertInto(id) => {
                match self.store.touch_and_increment(id, UPDATE_COUNT_KEY).await {
                    Ok(()) => {
                        tracing::info!(seed_id = %id, "Merged near-duplicate seed");
                        Ok(StoreOutcome::Updated(id))
                    }
                    Err(e) if e.is_not_found() => {
                        tracing::warn!(
                            seed_id = %id,
                            "Near-duplicate vanished before refresh, inserting instead"
                        );
                        self.insert(new_seed).await
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Similarity search, default limit 10, uncapped
    pub async fn search(&self, request: SearchSeedsRequest) -> Result<Vec<Seed>, DomainError> {
        self.search_with_default(request, DEFAULT_SEARCH_LIMIT, None).await
    }

    /// Similarity search, default limit 30, capped at `MAX_SEARCH_LIMIT`
    pub async fn query(&self, request: SearchSeedsRequest) -> Result<Vec<Seed>, DomainError> {
        self.search_with_default(request, DEFAULT_QUERY_LIMIT, Some(MAX_SEARCH_LIMIT))
            .await
    }

    /// Newest seeds first, without vector math
    pub async fn recent(&self, limit: Option<i64>, scope: Scope) -> Result<Vec<Seed>, DomainError> {
        let limit = resolve_limit(limit, DEFAULT_SEARCH_LIMIT, None);
        let query = RecentQuery::new(limit)?.with_scope(scope);
        self.search.recent(&query).await
    }

    /// Get a seed, returning an error if not found
    pub async fn get(&self, id: SeedId) -> Result<Seed, DomainError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Seed {} not found", id)))
    }

    /// Overwrite a seed's content, metadata and scope; the embedding is recomputed
    pub async fn update(&self, id: SeedId, request: StoreSeedRequest) -> Result<(), DomainError> {
        validate_content(&request.content)?;
        let metadata = metadata_from_value(request.metadata)?;

        let embedding = self.embeddings.get(&request.content).await?;

        self.store
            .update(
                id,
                NewSeed::new(request.content, embedding.to_vec())
                    .with_metadata(metadata)
                    .with_scope(request.scope),
            )
            .await?;

        tracing::info!(seed_id = %id, "Seed updated");
        Ok(())
    }

    /// Shallow-merge a JSON object into a seed's metadata
    pub async fn patch_metadata(&self, id: SeedId, patch: Value) -> Result<(), DomainError> {
        let Value::Object(patch) = patch else {
            return Err(DomainError::validation("metadata patch must be a JSON object"));
        };

        self.store.patch_metadata(id, &patch).await
    }

    /// Replace a seed's `tags` metadata entry
    pub async fn set_tags(&self, id: SeedId, tags: Vec<String>) -> Result<(), DomainError> {
        let mut patch = Metadata::new();
        patch.insert("tags".to_string(), tags.into());

        self.store.patch_metadata(id, &patch).await
    }

    pub async fn count(&self) -> Result<u64, DomainError> {
        self.store.count().await
    }

    pub async fn health_check(&self) -> Result<(), DomainError> {
        self.store.health_check().await
    }

    async fn search_with_default(
        &self,
        request: SearchSeedsRequest,
        default_limit: u32,
        cap: Option<u32>,
    ) -> Result<Vec<Seed>, DomainError> {
        if request.query.trim().is_empty() {
            return Err(DomainError::validation("query required"));
        }

        // Reject a bad threshold before paying for an embedding
        let threshold = resolve_threshold(request.threshold)?;
        let limit = resolve_limit(request.limit, default_limit, cap);

        let embedding = self.embeddings.get(&request.query).await?;

        let query = SearchQuery::new(embedding, limit)?
            .with_ids(request.seed_ids)
            .with_scope(request.scope)
            .with_threshold(threshold)?;

        self.search.nearest(&query).await
    }

    async fn insert(&self, seed: NewSeed) -> Result<StoreOutcome, DomainError> {
        let id = self.store.insert(seed).await?;
        tracing::info!(seed_id = %id, "Seed stored");
        Ok(StoreOutcome::Inserted(id))
    }

    async fn write_guard(&self) -> Option<MutexGuard<'_, ()>> {
        match self.write_lock {
            Some(ref lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().is_empty() {
        return Err(DomainError::validation("content required"));
    }

    Ok(())
}
