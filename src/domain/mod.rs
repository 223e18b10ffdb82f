//! Domain layer - Core business logic and entities

pub mod context;
pub mod embedding;
pub mod error;
pub mod seed;

pub use context::{AgentContext, ContextFilter, ContextRepository, MemoryType, NewAgentContext};
pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use error::DomainError;
pub use seed::{
    DedupeDecider, DedupeDecision, DedupeThreshold, Metadata, Neighbor, NewSeed, RecentQuery,
    Scope, SearchQuery, Seed, SeedFilter, SeedId, SeedSearch, StoreOutcome, VectorStore,
};
