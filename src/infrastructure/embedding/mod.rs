//! Embedding provider implementations and the embedding cache

mod cache;
pub(crate) mod http_client;
mod openai;

pub use cache::{CacheStats, EmbeddingCache, DEFAULT_CACHE_SIZE};
pub use http_client::{map_reqwest_error, HttpClient, HttpClientTrait};
pub use openai::OpenAiEmbeddingProvider;
