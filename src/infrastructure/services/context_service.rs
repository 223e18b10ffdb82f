//! Context service - validation and persistence of agent contexts

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::domain::{
    AgentContext, ContextFilter, ContextRepository, DomainError, MemoryType, NewAgentContext,
    Scope,
};

/// Prefix given to metadata keys folded into a context payload
const METADATA_KEY_PREFIX: &str = "metadata_";

/// Request to create an agent context
#[derive(Debug, Clone, Default)]
pub struct CreateContextRequest {
    pub agent_id: String,
    pub memory_type: String,
    pub payload: Option<Value>,
    /// Used when `payload` is absent or null
    pub data: Option<Value>,
    /// Object whose keys are copied into an object payload as `metadata_<key>`
    pub metadata: Option<Value>,
    pub scope: Scope,
}

/// Filters for listing agent contexts; empty strings match anything
#[derive(Debug, Clone, Default)]
pub struct ListContextsRequest {
    pub agent_id: Option<String>,
    pub memory_type: Option<String>,
    pub scope: Scope,
}

/// Agent context service
pub struct ContextService {
    repository: Arc<dyn ContextRepository>,
}

impl std::fmt::Debug for ContextService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextService").finish()
    }
}

impl ContextService {
    pub fn new(repository: Arc<dyn ContextRepository>) -> Self {
        Self { repository }
    }

    /// Validate and store a context, returning its id
    pub async fn create(&self, request: CreateContextRequest) -> Result<Uuid, DomainError> {
        let agent_id = request.agent_id.trim();
        if agent_id.is_empty() {
            return Err(DomainError::validation("agentId required"));
        }

        let memory_type: MemoryType = request.memory_type.parse()?;
        let payload = build_payload(request.payload, request.data, request.metadata);

        let id = self
            .repository
            .insert(NewAgentContext {
                agent_id: agent_id.to_string(),
                memory_type,
                payload,
                scope: request.scope,
            })
            .await?;

        tracing::info!(context_id = %id, agent_id, memory_type = %memory_type, "Agent context stored");
        Ok(id)
    }

    /// Contexts matching every supplied filter, oldest first
    pub async fn list(&self, request: ListContextsRequest) -> Result<Vec<AgentContext>, DomainError> {
        let agent_id = request
            .agent_id
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());

        let memory_type = match request.memory_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<MemoryType>()?),
        };

        self.repository
            .list(&ContextFilter {
                agent_id,
                memory_type,
                scope: request.scope,
            })
            .await
    }

    /// Get a context by its UUID string
    pub async fn get(&self, id: &str) -> Result<AgentContext, DomainError> {
        let uuid = Uuid::parse_str(id.trim())
            .map_err(|_| DomainError::invalid_id(format!("invalid context id '{}'", id)))?;

        self.repository
            .get(uuid)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Agent context {} not found", uuid)))
    }

    pub async fn count(&self) -> Result<u64, DomainError> {
        self.repository.count().await
    }
}

/// Pick the stored payload and fold metadata into it
fn build_payload(payload: Option<Value>, data: Option<Value>, metadata: Option<Value>) -> Value {
    let mut payload = [payload, data]
        .into_iter()
        .flatten()
        .find(|v| !v.is_null())
        .unwrap_or_else(|| Value::Object(Default::default()));

    if let (Some(Value::Object(metadata)), Value::Object(target)) = (metadata, &mut payload) {
        for (key, value) in metadata {
            target.insert(format!("{}{}", METADATA_KEY_PREFIX, key), value);
        }
    }

    payload
}
