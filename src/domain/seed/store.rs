//! Vector store trait

use async_trait::async_trait;

use super::entity::{Metadata, NewSeed, Scope, Seed, SeedId};
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Closest stored row to a probe embedding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub id: SeedId,
    /// Cosine similarity in `[-1, 1]`
    pub similarity: f64,
}

impl Neighbor {
    pub fn new(id: SeedId, similarity: f64) -> Self {
        Self { id, similarity }
    }
}

/// Row restrictions for a nearest-neighbor query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedFilter {
    /// Restrict to these ids; empty means no id restriction
    pub ids: Vec<SeedId>,
    pub scope: Scope,
}

impl SeedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(mut self, ids: Vec<SeedId>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Whether a row passes the id and scope restrictions
    pub fn admits(&self, id: SeedId, scope: &Scope) -> bool {
        (self.ids.is_empty() || self.ids.contains(&id)) && self.scope.admits(scope)
    }
}

/// Persistence and k-nearest-neighbor search over seeds
///
/// Implementations rank by cosine similarity. Writes are single statements, so a
/// dropped future leaves either the whole row change or none of it.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend name, for logging
    fn store_type(&self) -> &'static str;

    /// Insert a new row and return its id
    async fn insert(&self, seed: NewSeed) -> Result<SeedId, DomainError>;

    /// The single most similar row across the whole store, if any
    async fn nearest_neighbor(&self, embedding: &[f32]) -> Result<Option<Neighbor>, DomainError>;

    /// Set the row's timestamp to now and increment the integer metadata counter `counter_key`
    async fn touch_and_increment(&self, id: SeedId, counter_key: &str) -> Result<(), DomainError>;

    /// Up to `limit` rows passing `filter`, by descending similarity, with `score` set
    async fn query_nearest(
        &self,
        embedding: &[f32],
        limit: u32,
        filter: &SeedFilter,
    ) -> Result<Vec<Seed>, DomainError>;

    /// Up to `limit` rows passing `scope`, newest first, with `score` set to 0
    async fn query_recent(&self, limit: u32, scope: &Scope) -> Result<Vec<Seed>, DomainError>;

    /// Get a row by id
    async fn get(&self, id: SeedId) -> Result<Option<Seed>, DomainError>;

    /// Overwrite content, embedding, metadata and scope of a row
    async fn update(&self, id: SeedId, seed: NewSeed) -> Result<(), DomainError>;

    /// Shallow-merge `patch` into the row's metadata
    async fn patch_metadata(&self, id: SeedId, patch: &Metadata) -> Result<(), DomainError>;

    /// Total number of rows
    async fn count(&self) -> Result<u64, DomainError>;

    /// Check the backend is reachable
    async fn health_check(&self) -> Result<(), DomainError>;
}
