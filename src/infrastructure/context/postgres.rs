//! PostgreSQL agent context repository

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::domain::{
    AgentContext, ContextFilter, ContextRepository, DomainError, MemoryType, NewAgentContext, Scope,
};
use crate::infrastructure::storage::map_sqlx_error;

const CONTEXT_COLUMNS: &str =
    "id, agent_id, memory_type, payload, app_id, external_user_id, created_at";

/// Agent contexts in the `agent_contexts` table
pub struct PostgresContextRepository {
    pool: PgPool,
}

impl Debug for PostgresContextRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresContextRepository").finish()
    }
}

impl PostgresContextRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the table and indexes if missing
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_contexts (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                agent_id TEXT NOT NULL,
                memory_type TEXT NOT NULL,
                payload JSONB NOT NULL DEFAULT '{}',
                app_id TEXT NOT NULL DEFAULT '',
                external_user_id TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to create agent_contexts table", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_agent_contexts_agent ON agent_contexts (agent_id, memory_type)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to create agent_contexts index", e))?;

        Ok(())
    }
}

/// Equality-filtered listing, oldest first
pub(crate) fn build_list_query(filter: &ContextFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT ");
    builder
        .push(CONTEXT_COLUMNS)
        .push(" FROM agent_contexts WHERE 1=1");

    if let Some(ref agent_id) = filter.agent_id {
        builder.push(" AND agent_id = ").push_bind(agent_id.clone());
    }

    if let Some(memory_type) = filter.memory_type {
        builder
            .push(" AND memory_type = ")
            .push_bind(memory_type.as_str().to_string());
    }

    if let Some(app_id) = filter.scope.app_id() {
        builder.push(" AND app_id = ").push_bind(app_id.to_string());
    }

    if let Some(user_id) = filter.scope.external_user_id() {
        builder
            .push(" AND external_user_id = ")
            .push_bind(user_id.to_string());
    }

    builder.push(" ORDER BY created_at, id");
    builder
}

fn context_from_row(row: &PgRow) -> Result<AgentContext, DomainError> {
    let decode = |e| map_sqlx_error("Failed to decode agent context row", e);

    let memory_type: String = row.try_get("memory_type").map_err(decode)?;
    let app_id: String = row.try_get("app_id").map_err(decode)?;
    let external_user_id: String = row.try_get("external_user_id").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;

    Ok(AgentContext {
        id: row.try_get("id").map_err(decode)?,
        agent_id: row.try_get("agent_id").map_err(decode)?,
        memory_type: memory_type.parse::<MemoryType>()?,
        payload: row.try_get("payload").map_err(decode)?,
        scope: Scope::new(Some(app_id), Some(external_user_id)),
        created_at,
    })
}

#[async_trait]
impl ContextRepository for PostgresContextRepository {
    async fn insert(&self, context: NewAgentContext) -> Result<Uuid, DomainError> {
        let row = sqlx::query(
            r#"
            INSERT INTO agent_contexts (agent_id, memory_type, payload, app_id, external_user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&context.agent_id)
        .bind(context.memory_type.as_str())
        .bind(&context.payload)
        .bind(context.scope.app_id().unwrap_or_default())
        .bind(context.scope.external_user_id().unwrap_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to insert agent context", e))?;

        row.try_get("id")
            .map_err(|e| map_sqlx_error("Failed to read agent context id", e))
    }

    async fn list(&self, filter: &ContextFilter) -> Result<Vec<AgentContext>, DomainError> {
        let mut builder = build_list_query(filter);
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to list agent contexts", e))?;

        rows.iter().map(context_from_row).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<AgentContext>, DomainError> {
        let query = format!("SELECT {} FROM agent_contexts WHERE id = $1", CONTEXT_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to get agent context", e))?;

        row.as_ref().map(context_from_row).transpose()
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM agent_contexts")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count agent contexts", e))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| map_sqlx_error("Failed to count agent contexts", e))?;

        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_without_filters() {
        let builder = build_list_query(&ContextFilter::default());

        assert_eq!(
            builder.sql(),
            "SELECT id, agent_id, memory_type, payload, app_id, external_user_id, created_at \
             FROM agent_contexts WHERE 1=1 ORDER BY created_at, id"
        );
    }

    #[test]
    fn test_list_query_with_every_filter() {
        let filter = ContextFilter {
            agent_id: Some("agent-1".to_string()),
            memory_type: Some(MemoryType::Semantic),
            scope: Scope::unscoped().with_app_id("app").with_external_user_id("user"),
        };

        let builder = build_list_query(&filter);
        let sql = builder.sql();

        assert!(sql.contains(
            "WHERE 1=1 AND agent_id = $1 AND memory_type = $2 AND app_id = $3 AND external_user_id = $4"
        ));
        assert!(sql.ends_with("ORDER BY created_at, id"));
    }

    #[test]
    fn test_list_query_numbers_only_present_filters() {
        let filter = ContextFilter {
            memory_type: Some(MemoryType::Working),
            ..Default::default()
        };

        let builder = build_list_query(&filter);

        assert!(builder.sql().contains("WHERE 1=1 AND memory_type = $1 ORDER BY"));
    }
}
