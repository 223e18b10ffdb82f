//! Embedding provider trait definition

use async_trait::async_trait;
use std::fmt::Debug;

use crate::domain::DomainError;

/// Trait for embedding providers (local models, OpenAI-compatible servers, etc.)
///
/// Implementations must return either a complete vector of `dimensions()` floats or
/// an error; never a partially filled vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + Debug {
    /// Generate the embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;

    /// Get the embedding dimensions produced by this provider
    fn dimensions(&self) -> usize;
}

#[cfg(test)]
pub mod mock {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Deterministic embedding provider for tests
    #[derive(Debug)]
    pub struct MockEmbeddingProvider {
        name: &'static str,
        dimensions: usize,
        error: Option<String>,
        unavailable: AtomicBool,
        delay: Option<Duration>,
        fixed: HashMap<String, Vec<f32>>,
        calls: AtomicUsize,
        failing_calls: usize,
    }

    impl MockEmbeddingProvider {
        pub fn new(name: &'static str, dimensions: usize) -> Self {
            Self {
                name,
                dimensions,
                error: None,
                unavailable: AtomicBool::new(false),
                delay: None,
                fixed: HashMap::new(),
                calls: AtomicUsize::new(0),
                failing_calls: 0,
            }
        }

        /// Fail every call with `ProviderFailed`
        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        /// Fail only the first `count` calls with `ProviderFailed`
        pub fn with_failures(mut self, count: usize) -> Self {
            self.failing_calls = count;
            self
        }

        /// Sleep before answering, so concurrent callers overlap
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Return a fixed vector for the given text
        pub fn with_embedding(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
            self.fixed.insert(text.into(), vector);
            self
        }

        /// Toggle `ProviderUnavailable` failures at runtime
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Number of `embed` calls made so far
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbeddingProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, DomainError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if call < self.failing_calls {
                return Err(DomainError::provider_failed(self.name, "transient failure"));
            }

            if self.unavailable.load(Ordering::SeqCst) {
                return Err(DomainError::provider_unavailable("mock model not loaded"));
            }

            if let Some(ref error) = self.error {
                return Err(DomainError::provider_failed(self.name, error));
            }

            if let Some(vector) = self.fixed.get(text) {
                return Ok(vector.clone());
            }

            // Generate deterministic mock embedding based on text hash
            let hash = text.bytes().fold(0u64, |acc, b| acc.wrapping_add(b as u64));
            Ok((0..self.dimensions)
                .map(|i| ((hash.wrapping_add(i as u64) % 1000) as f32 / 1000.0) - 0.5)
                .collect())
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_provider_dimensions() {
            let provider = MockEmbeddingProvider::new("test", 128);

            let vector = provider.embed("Hello").await.unwrap();

            assert_eq!(vector.len(), 128);
            assert_eq!(provider.calls(), 1);
        }

        #[tokio::test]
        async fn test_mock_provider_error() {
            let provider = MockEmbeddingProvider::new("test", 128).with_error("model crashed");

            let result = provider.embed("Hello").await;

            assert!(matches!(result, Err(DomainError::ProviderFailed { .. })));
        }

        #[tokio::test]
        async fn test_mock_provider_unavailable_toggle() {
            let provider = MockEmbeddingProvider::new("test", 4);

            provider.set_unavailable(true);
            assert!(matches!(
                provider.embed("Hello").await,
                Err(DomainError::ProviderUnavailable { .. })
            ));

            provider.set_unavailable(false);
            assert!(provider.embed("Hello").await.is_ok());
        }

        #[tokio::test]
        async fn test_mock_provider_fails_first_calls_only() {
            let provider = MockEmbeddingProvider::new("test", 4).with_failures(2);

            assert!(provider.embed("Hello").await.is_err());
            assert!(provider.embed("Hello").await.is_err());
            assert!(provider.embed("Hello").await.is_ok());
            assert_eq!(provider.calls(), 3);
        }

        #[tokio::test]
        async fn test_deterministic_embeddings() {
            let provider = MockEmbeddingProvider::new("test", 16)
                .with_embedding("fixed", vec![1.0; 16]);

            assert_eq!(
                provider.embed("Hello").await.unwrap(),
                provider.embed("Hello").await.unwrap()
            );
            assert_eq!(provider.embed("fixed").await.unwrap(), vec![1.0; 16]);
        }
    }
}
