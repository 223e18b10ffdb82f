//! Agent context repository trait

use async_trait::async_trait;
use uuid::Uuid;

use super::entity::{AgentContext, ContextFilter, NewAgentContext};
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Persistence for agent contexts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContextRepository: Send + Sync {
    /// Store a new context and return its id
    async fn insert(&self, context: NewAgentContext) -> Result<Uuid, DomainError>;

    /// Contexts passing `filter`, oldest first
    async fn list(&self, filter: &ContextFilter) -> Result<Vec<AgentContext>, DomainError>;

    /// Get a context by id
    async fn get(&self, id: Uuid) -> Result<Option<AgentContext>, DomainError>;

    /// Total number of contexts
    async fn count(&self) -> Result<u64, DomainError>;
}
