//! Filtered similarity search and recent listing

use std::sync::Arc;

use super::entity::{Scope, Seed, SeedId};
use super::store::{SeedFilter, VectorStore};
use crate::domain::error::DomainError;

/// Default result count for plain search and recent listing
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Default result count for query-style search
pub const DEFAULT_QUERY_LIMIT: u32 = 30;

/// Upper bound on query-style result counts
pub const MAX_SEARCH_LIMIT: u32 = 100;

/// Resolve a caller-supplied limit: non-positive or absent gets `default`,
/// and the result is capped at `cap` when one is given.
pub fn resolve_limit(requested: Option<i64>, default: u32, cap: Option<u32>) -> u32 {
    let limit = match requested {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => default.max(1),
    };

    match cap {
        Some(cap) => limit.min(cap.max(1)),
        None => limit,
    }
}

/// Resolve a caller-supplied similarity threshold.
///
/// Absent or negative means "no threshold"; above 1 or NaN is rejected.
pub fn resolve_threshold(requested: Option<f64>) -> Result<Option<f64>, DomainError> {
    match requested {
        None => Ok(None),
        Some(t) if t.is_nan() || t > 1.0 => Err(DomainError::invalid_threshold(t)),
        Some(t) if t < 0.0 => Ok(None),
        Some(t) => Ok(Some(t)),
    }
}

/// Nearest-neighbor query, built per request
#[derive(Debug, Clone)]
pub struct SearchQuery {
    embedding: Arc<[f32]>,
    limit: u32,
    filter: SeedFilter,
    threshold: Option<f64>,
}

impl SearchQuery {
    /// Create a query; a zero limit is rejected rather than passed to the store
    pub fn new(embedding: Arc<[f32]>, limit: u32) -> Result<Self, DomainError> {
        if limit == 0 {
            return Err(DomainError::invalid_limit(0, "limit must be positive"));
        }

        Ok(Self {
            embedding,
            limit,
            filter: SeedFilter::default(),
            threshold: None,
        })
    }

    /// Restrict to these seed ids (empty means no restriction)
    pub fn with_ids(mut self, ids: Vec<SeedId>) -> Self {
        self.filter.ids = ids;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.filter.scope = scope;
        self
    }

    /// Drop results scoring below `threshold` after limiting
    pub fn with_threshold(mut self, threshold: Option<f64>) -> Result<Self, DomainError> {
        self.threshold = resolve_threshold(threshold)?;
        Ok(self)
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn filter(&self) -> &SeedFilter {
        &self.filter
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }
}

/// Chronological listing, built per request
#[derive(Debug, Clone, PartialEq)]
pub struct RecentQuery {
    limit: u32,
    scope: Scope,
}

impl RecentQuery {
    pub fn new(limit: u32) -> Result<Self, DomainError> {
        if limit == 0 {
            return Err(DomainError::invalid_limit(0, "limit must be positive"));
        }

        Ok(Self {
            limit,
            scope: Scope::default(),
        })
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// Keep only results scoring at least `threshold`, preserving order
pub fn apply_threshold(results: &mut Vec<Seed>, threshold: Option<f64>) {
    if let Some(threshold) = threshold {
        results.retain(|seed| seed.score >= threshold);
    }
}

/// Runs filtered nearest-neighbor and recent queries against a store.
///
/// Ranking and filtering happen in the store; the similarity threshold is applied
/// afterwards, to the already-limited ranked list. A threshold therefore never pulls
/// lower-ranked rows into the result: fewer than `limit` rows may come back.
#[derive(Clone)]
pub struct SeedSearch {
    store: Arc<dyn VectorStore>,
}

impl std::fmt::Debug for SeedSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedSearch")
            .field("store", &self.store.store_type())
            .finish()
    }
}

impl SeedSearch {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }

    /// Ranked results with `score` populated
    pub async fn nearest(&self, query: &SearchQuery) -> Result<Vec<Seed>, DomainError> {
        let mut results = self
            .store
            .query_nearest(query.embedding(), query.limit(), query.filter())
            .await?;

        let fetched = results.len();
        results.truncate(query.limit() as usize);
        apply_threshold(&mut results, query.threshold());

        tracing::debug!(
            store = self.store.store_type(),
            limit = query.limit(),
            id_filter = query.filter().ids.len(),
            threshold = query.threshold(),
            fetched,
            returned = results.len(),
            "Nearest-neighbor search completed"
        );

        Ok(results)
    }

    /// Newest rows first, every score reported as 0
    pub async fn recent(&self, query: &RecentQuery) -> Result<Vec<Seed>, DomainError> {
        let mut results = self
            .store
            .query_recent(query.limit(), query.scope())
            .await?;

        results.truncate(query.limit() as usize);
        for seed in &mut results {
            seed.score = 0.0;
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::seed::entity::Metadata;
    use crate::domain::seed::store::MockVectorStore;
    use chrono::Utc;

    fn seed(id: i64, score: f64) -> Seed {
        Seed {
            id: SeedId::new(id),
            content: format!("seed {}", id),
            metadata: Metadata::new(),
            scope: Scope::default(),
            created_at: Utc::now(),
            score,
        }
    }

    fn ranked_store(scores: Vec<f64>) -> MockVectorStore {
        let mut store = MockVectorStore::new();
        store.expect_store_type().return_const("mock");
        store
            .expect_query_nearest()
            .returning(move |_, limit, _| {
                Ok(scores
                    .iter()
                    .enumerate()
                    .take(limit as usize)
                    .map(|(i, s)| seed(i as i64 + 1, *s))
                    .collect())
            });
        store
    }

    fn query(limit: u32, threshold: Option<f64>) -> SearchQuery {
        SearchQuery::new(Arc::from(vec![1.0_f32, 0.0]), limit)
            .unwrap()
            .with_threshold(threshold)
            .unwrap()
    }

    fn scores(results: &[Seed]) -> Vec<f64> {
        results.iter().map(|s| s.score).collect()
    }

    #[test]
    fn test_resolve_limit() {
        assert_eq!(resolve_limit(None, DEFAULT_SEARCH_LIMIT, None), 10);
        assert_eq!(resolve_limit(Some(0), DEFAULT_SEARCH_LIMIT, None), 10);
        assert_eq!(resolve_limit(Some(-5), DEFAULT_QUERY_LIMIT, None), 30);
        assert_eq!(resolve_limit(Some(7), DEFAULT_QUERY_LIMIT, None), 7);
        assert_eq!(resolve_limit(Some(150), DEFAULT_SEARCH_LIMIT, None), 150);
        assert_eq!(
            resolve_limit(Some(5000), DEFAULT_QUERY_LIMIT, Some(MAX_SEARCH_LIMIT)),
            MAX_SEARCH_LIMIT
        );
        assert_eq!(
            resolve_limit(None, DEFAULT_QUERY_LIMIT, Some(MAX_SEARCH_LIMIT)),
            30
        );
    }

    #[test]
    fn test_resolve_threshold() {
        assert_eq!(resolve_threshold(None).unwrap(), None);
        assert_eq!(resolve_threshold(Some(-1.0)).unwrap(), None);
        assert_eq!(resolve_threshold(Some(0.0)).unwrap(), Some(0.0));
        assert_eq!(resolve_threshold(Some(0.75)).unwrap(), Some(0.75));
        assert!(resolve_threshold(Some(1.5)).is_err());
        assert!(resolve_threshold(Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let result = SearchQuery::new(Arc::from(vec![1.0_f32]), 0);
        assert!(matches!(result, Err(DomainError::InvalidLimit { .. })));
        assert!(RecentQuery::new(0).is_err());
    }

    #[tokio::test]
    async fn test_limit_applies_before_threshold() {
        let search = SeedSearch::new(Arc::new(ranked_store(vec![0.9, 0.6, 0.4, 0.3])));

        let top3 = search.nearest(&query(3, Some(0.5))).await.unwrap();
        assert_eq!(scores(&top3), vec![0.9, 0.6]);

        let top4 = search.nearest(&query(4, Some(0.5))).await.unwrap();
        assert_eq!(scores(&top4), vec![0.9, 0.6]);
    }

    #[tokio::test]
    async fn test_threshold_does_not_backfill() {
        let search = SeedSearch::new(Arc::new(ranked_store(vec![0.9, 0.2, 0.8, 0.7])));

        let results = search.nearest(&query(2, Some(0.5))).await.unwrap();

        assert_eq!(scores(&results), vec![0.9]);
    }

    #[tokio::test]
    async fn test_no_threshold_returns_limited_ranking() {
        let search = SeedSearch::new(Arc::new(ranked_store(vec![0.9, 0.6, 0.4, 0.3])));

        let results = search.nearest(&query(3, Some(-1.0))).await.unwrap();

        assert_eq!(scores(&results), vec![0.9, 0.6, 0.4]);
    }

    #[tokio::test]
    async fn test_store_returning_too_many_rows_is_capped() {
        let mut store = MockVectorStore::new();
        store.expect_store_type().return_const("mock");
        store
            .expect_query_nearest()
            .returning(|_, _, _| Ok((1..=5).map(|i| seed(i, 0.5)).collect()));
        let search = SeedSearch::new(Arc::new(store));

        let results = search.nearest(&query(2, None)).await.unwrap();

        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_filter_is_passed_to_store() {
        let mut store = MockVectorStore::new();
        store.expect_store_type().return_const("mock");
        store
            .expect_query_nearest()
            .withf(|_, limit, filter| {
                *limit == 5
                    && filter.ids == vec![SeedId::new(2), SeedId::new(4)]
                    && filter.scope.app_id() == Some("app")
                    && filter.scope.external_user_id() == Some("user")
            })
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));
        let search = SeedSearch::new(Arc::new(store));

        let query = query(5, None)
            .with_ids(vec![SeedId::new(2), SeedId::new(4)])
            .with_scope(Scope::unscoped().with_app_id("app").with_external_user_id("user"));
        let results = search.nearest(&query).await.unwrap();

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let mut store = MockVectorStore::new();
        store.expect_store_type().return_const("mock");
        store
            .expect_query_nearest()
            .returning(|_, _, _| Err(DomainError::storage("syntax error")));
        let search = SeedSearch::new(Arc::new(store));

        let result = search.nearest(&query(3, None)).await;

        assert!(matches!(result, Err(DomainError::Storage { .. })));
    }

    #[tokio::test]
    async fn test_recent_reports_zero_scores() {
        let mut store = MockVectorStore::new();
        store.expect_store_type().return_const("mock");
        store
            .expect_query_recent()
            .times(1)
            .returning(|_, _| Ok(vec![seed(3, 0.7), seed(2, 0.0)]));
        let search = SeedSearch::new(Arc::new(store));

        let results = search.recent(&RecentQuery::new(10).unwrap()).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|s| s.score == 0.0));
    }
}
