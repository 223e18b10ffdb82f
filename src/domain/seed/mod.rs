//! Seed domain - stored text with embeddings, dedupe and similarity search

mod dedupe;
mod entity;
mod search;
mod store;

pub use dedupe::{DedupeDecider, DedupeDecision, DedupeThreshold};
pub use entity::{
    merge_metadata, metadata_from_value, next_counter_value, Metadata, NewSeed, Scope, Seed,
    SeedId, StoreOutcome, UPDATE_COUNT_KEY,
};
pub use search::{
    apply_threshold, resolve_limit, resolve_threshold, RecentQuery, SearchQuery, SeedSearch,
    DEFAULT_QUERY_LIMIT, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT,
};
pub use store::{Neighbor, SeedFilter, VectorStore};

#[cfg(test)]
pub use store::MockVectorStore;
