//! Application state for shared services

use std::sync::Arc;

use serde::Serialize;

use crate::domain::DomainError;
use crate::infrastructure::services::{ContextService, SeedService};

/// Row counts across both tables, serialized as `{"seeds", "agent_contexts"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub seeds: u64,
    pub agent_contexts: u64,
}

/// Application state containing the wired services
#[derive(Debug, Clone)]
pub struct AppState {
    pub seeds: Arc<SeedService>,
    pub contexts: Arc<ContextService>,
}

impl AppState {
    pub fn new(seeds: Arc<SeedService>, contexts: Arc<ContextService>) -> Self {
        Self { seeds, contexts }
    }

    pub async fn stats(&self) -> Result<Stats, DomainError> {
        Ok(Stats {
            seeds: self.seeds.count().await?,
            agent_contexts: self.contexts.count().await?,
        })
    }

    /// Check the backing store is reachable
    pub async fn health_check(&self) -> Result<(), DomainError> {
        self.seeds.health_check().await
    }
}
