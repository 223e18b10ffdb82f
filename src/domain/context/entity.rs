//! Agent context entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::seed::Scope;
use crate::domain::DomainError;

/// Category of memory an agent context holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    Episodic,
    Semantic,
    Procedural,
    Working,
}

impl MemoryType {
    pub const ALL: [MemoryType; 4] = [
        MemoryType::Episodic,
        MemoryType::Semantic,
        MemoryType::Procedural,
        MemoryType::Working,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Working => "working",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = DomainError;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();

        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| {
                DomainError::validation(
                    "memoryType must be one of: episodic, semantic, procedural, working",
                )
            })
    }
}

/// A stored agent context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentContext {
    pub id: Uuid,
    pub agent_id: String,
    pub memory_type: MemoryType,
    pub payload: Value,
    #[serde(flatten)]
    pub scope: Scope,
    pub created_at: DateTime<Utc>,
}

/// Write model for a new agent context
#[derive(Debug, Clone, PartialEq)]
pub struct NewAgentContext {
    pub agent_id: String,
    pub memory_type: MemoryType,
    pub payload: Value,
    pub scope: Scope,
}

/// Equality filters for listing contexts; `None` matches anything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextFilter {
    pub agent_id: Option<String>,
    pub memory_type: Option<MemoryType>,
    pub scope: Scope,
}

impl ContextFilter {
    pub fn admits(&self, context: &AgentContext) -> bool {
        if let Some(ref agent_id) = self.agent_id {
            if &context.agent_id != agent_id {
                return false;
            }
        }

        if let Some(memory_type) = self.memory_type {
            if context.memory_type != memory_type {
                return false;
            }
        }

        self.scope.admits(&context.scope)
    }
}
