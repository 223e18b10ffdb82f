//! In-memory agent context repository

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{AgentContext, ContextFilter, ContextRepository, DomainError, NewAgentContext};

/// Agent contexts kept in insertion order
#[derive(Debug, Default)]
pub struct InMemoryContextRepository {
    contexts: RwLock<Vec<AgentContext>>,
}

impl InMemoryContextRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextRepository for InMemoryContextRepository {
    async fn insert(&self, context: NewAgentContext) -> Result<Uuid, DomainError> {
        let id = Uuid::new_v4();

        self.contexts.write().await.push(AgentContext {
            id,
            agent_id: context.agent_id,
            memory_type: context.memory_type,
            payload: context.payload,
            scope: context.scope,
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn list(&self, filter: &ContextFilter) -> Result<Vec<AgentContext>, DomainError> {
        let contexts = self.contexts.read().await;

        Ok(contexts
            .iter()
            .filter(|c| filter.admits(c))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<AgentContext>, DomainError> {
        let contexts = self.contexts.read().await;

        Ok(contexts.iter().find(|c| c.id == id).cloned())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        Ok(self.contexts.read().await.len() as u64)
    }
}
