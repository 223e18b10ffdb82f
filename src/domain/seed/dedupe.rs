//! Semantic deduplication decision

use super::entity::SeedId;
use super::store::{Neighbor, VectorStore};
use crate::domain::error::DomainError;

/// Minimum similarity at which new content is merged into an existing seed.
///
/// `0` disables deduplication.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct DedupeThreshold(f64);

impl DedupeThreshold {
    pub const DISABLED: Self = Self(0.0);

    /// Create a threshold; values outside `[0, 1]` (or NaN) are rejected
    pub fn new(value: f64) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(DomainError::invalid_threshold(value));
        }

        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_enabled(&self) -> bool {
        self.0 > 0.0
    }
}

/// Outcome of the dedupe probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupeDecision {
    /// No sufficiently similar row exists
    InsertNew,
    /// Merge into this existing row
    UpsertInto(SeedId),
}

/// Decides between inserting a new seed and upserting into a near-duplicate
#[derive(Debug, Clone, Copy, Default)]
pub struct DedupeDecider {
    threshold: DedupeThreshold,
}

impl DedupeDecider {
    pub fn new(threshold: DedupeThreshold) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> DedupeThreshold {
        self.threshold
    }

    /// Probe the store for the nearest row and decide.
    ///
    /// A disabled threshold never touches the store. Probe errors are returned as-is.
    pub async fn decide(
        &self,
        store: &dyn VectorStore,
        embedding: &[f32],
    ) -> Result<DedupeDecision, DomainError> {
        if !self.threshold.is_enabled() {
            return Ok(DedupeDecision::InsertNew);
        }

        let neighbor = store.nearest_neighbor(embedding).await?;
        let decision = self.decide_from(neighbor);

        tracing::debug!(
            threshold = self.threshold.value(),
            nearest_similarity = neighbor.map(|n| n.similarity),
            decision = ?decision,
            "Dedupe decision"
        );

        Ok(decision)
    }

    /// Decide from an already-fetched nearest neighbor
    pub fn decide_from(&self, neighbor: Option<Neighbor>) -> DedupeDecision {
        if self.threshold.value() <= 0.0 {
            return DedupeDecision::InsertNew;
        }

        match neighbor {
            Some(n) if n.similarity >= self.threshold.value() => DedupeDecision::UpsertInto(n.id),
            _ => DedupeDecision::InsertNew,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::seed::store::MockVectorStore;

    fn decider(threshold: f64) -> DedupeDecider {
        DedupeDecider::new(DedupeThreshold::new(threshold).unwrap())
    }

    #[test]
    fn test_threshold_validation() {
        assert!(DedupeThreshold::new(0.0).is_ok());
        assert!(DedupeThreshold::new(1.0).is_ok());
        assert!(DedupeThreshold::new(-0.1).is_err());
        assert!(DedupeThreshold::new(1.1).is_err());
        assert!(DedupeThreshold::new(f64::NAN).is_err());
        assert!(!DedupeThreshold::DISABLED.is_enabled());
        assert!(DedupeThreshold::new(0.92).unwrap().is_enabled());
    }

    #[tokio::test]
    async fn test_zero_threshold_never_probes() {
        let mut store = MockVectorStore::new();
        store.expect_nearest_neighbor().never();

        let decision = decider(0.0).decide(&store, &[1.0, 0.0]).await.unwrap();

        assert_eq!(decision, DedupeDecision::InsertNew);
    }

    #[test]
    fn test_zero_threshold_inserts_even_for_identical_neighbor() {
        let neighbor = Neighbor::new(SeedId::new(1), 1.0);

        assert_eq!(
            decider(0.0).decide_from(Some(neighbor)),
            DedupeDecision::InsertNew
        );
    }

    #[tokio::test]
    async fn test_boundary_similarity_is_a_match() {
        let mut store = MockVectorStore::new();
        store
            .expect_nearest_neighbor()
            .times(1)
            .returning(|_| Ok(Some(Neighbor::new(SeedId::new(7), 0.9))));

        let decision = decider(0.9).decide(&store, &[1.0, 0.0]).await.unwrap();

        assert_eq!(decision, DedupeDecision::UpsertInto(SeedId::new(7)));
    }

    #[tokio::test]
    async fn test_below_threshold_inserts_new() {
        let mut store = MockVectorStore::new();
        store
            .expect_nearest_neighbor()
            .times(1)
            .returning(|_| Ok(Some(Neighbor::new(SeedId::new(7), 0.8999))));

        let decision = decider(0.9).decide(&store, &[1.0, 0.0]).await.unwrap();

        assert_eq!(decision, DedupeDecision::InsertNew);
    }

    #[tokio::test]
    async fn test_empty_store_inserts_new() {
        let mut store = MockVectorStore::new();
        store
            .expect_nearest_neighbor()
            .times(1)
            .returning(|_| Ok(None));

        let decision = decider(0.5).decide(&store, &[1.0]).await.unwrap();

        assert_eq!(decision, DedupeDecision::InsertNew);
    }

    #[tokio::test]
    async fn test_probe_error_is_returned() {
        let mut store = MockVectorStore::new();
        store
            .expect_nearest_neighbor()
            .times(1)
            .returning(|_| Err(DomainError::store_unavailable("connection refused")));

        let result = decider(0.5).decide(&store, &[1.0]).await;

        assert!(matches!(result, Err(DomainError::StoreUnavailable { .. })));
    }
}
