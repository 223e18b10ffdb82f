//! Infrastructure services

mod context_service;
mod seed_service;

pub use context_service::{ContextService, CreateContextRequest, ListContextsRequest};
pub use seed_service::{SearchSeedsRequest, SeedService, StoreSeedRequest};
