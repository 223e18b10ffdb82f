//! In-memory seed store for development and testing

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::seed::{merge_metadata, next_counter_value};
use crate::domain::{
    cosine_similarity, DomainError, Metadata, Neighbor, NewSeed, Scope, Seed, SeedFilter, SeedId,
    VectorStore,
};

/// Brute-force vector store without PostgreSQL
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    state: Arc<RwLock<State>>,
}

#[derive(Debug, Default)]
struct State {
    rows: Vec<StoredSeed>,
    last_id: i64,
}

#[derive(Debug, Clone)]
struct StoredSeed {
    id: SeedId,
    content: String,
    embedding: Vec<f32>,
    metadata: Metadata,
    scope: Scope,
    created_at: DateTime<Utc>,
}

impl StoredSeed {
    fn to_seed(&self, score: f64) -> Seed {
        Seed {
            id: self.id,
            content: self.content.clone(),
            metadata: self.metadata.clone(),
            scope: self.scope.clone(),
            created_at: self.created_at,
            score,
        }
    }
}

impl State {
    fn row_mut(&mut self, id: SeedId) -> Result<&mut StoredSeed, DomainError> {
        self.rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| DomainError::not_found(format!("Seed {} not found", id)))
    }
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Highest similarity first; equal scores keep insertion order
fn by_score_desc(a: &Seed, b: &Seed) -> Ordering {
    b.score.total_cmp(&a.score).then(a.id.cmp(&b.id))
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn store_type(&self) -> &'static str {
        "in_memory"
    }

    async fn insert(&self, seed: NewSeed) -> Result<SeedId, DomainError> {
        let mut state = self.state.write().await;
        state.last_id += 1;
        let id = SeedId::new(state.last_id);

        state.rows.push(StoredSeed {
            id,
            content: seed.content,
            embedding: seed.embedding,
            metadata: seed.metadata,
            scope: seed.scope,
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn nearest_neighbor(&self, embedding: &[f32]) -> Result<Option<Neighbor>, DomainError> {
        let state = self.state.read().await;

        Ok(state
            .rows
            .iter()
            .map(|row| Neighbor::new(row.id, cosine_similarity(&row.embedding, embedding)))
            .max_by(|a, b| a.similarity.total_cmp(&b.similarity).then(b.id.cmp(&a.id))))
    }

    async fn touch_and_increment(&self, id: SeedId, counter_key: &str) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let row = state.row_mut(id)?;

        let next = next_counter_value(&row.metadata, counter_key);
        row.metadata.insert(counter_key.to_string(), next.into());
        row.created_at = Utc::now();

        Ok(())
    }

    async fn query_nearest(
        &self,
        embedding: &[f32],
        limit: u32,
        filter: &SeedFilter,
    ) -> Result<Vec<Seed>, DomainError> {
        let state = self.state.read().await;

        let mut results: Vec<Seed> = state
            .rows
            .iter()
            .filter(|row| filter.admits(row.id, &row.scope))
            .map(|row| row.to_seed(cosine_similarity(&row.embedding, embedding)))
            .collect();

        results.sort_by(by_score_desc);
        results.truncate(limit as usize);

        Ok(results)
    }

    async fn query_recent(&self, limit: u32, scope: &Scope) -> Result<Vec<Seed>, DomainError> {
        let state = self.state.read().await;

        let mut results: Vec<Seed> = state
            .rows
            .iter()
            .filter(|row| scope.admits(&row.scope))
            .map(|row| row.to_seed(0.0))
            .collect();

        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        results.truncate(limit as usize);

        Ok(results)
    }

    async fn get(&self, id: SeedId) -> Result<Option<Seed>, DomainError> {
        let state = self.state.read().await;

        Ok(state
            .rows
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.to_seed(0.0)))
    }

    async fn update(&self, id: SeedId, seed: NewSeed) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let row = state.row_mut(id)?;

        row.content = seed.content;
        row.embedding = seed.embedding;
        row.metadata = seed.metadata;
        row.scope = seed.scope;

        Ok(())
    }

    async fn patch_metadata(&self, id: SeedId, patch: &Metadata) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let row = state.row_mut(id)?;

        merge_metadata(&mut row.metadata, patch);

        Ok(())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Ok(self.state.read().await.rows.len() as u64)
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        Ok(())
    }
}
