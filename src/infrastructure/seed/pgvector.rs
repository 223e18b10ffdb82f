//! pgvector-backed seed store

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, QueryBuilder, Row};

use crate::domain::embedding::embedding_to_pgvector;
use crate::domain::seed::metadata_from_value;
use crate::domain::{
    DomainError, Metadata, Neighbor, NewSeed, Scope, Seed, SeedFilter, SeedId, VectorStore,
};
use crate::infrastructure::storage::map_sqlx_error;

const SEED_COLUMNS: &str = "id, content, metadata, app_id, external_user_id, created_at";

/// Secondary indexes on `seeds`.
///
/// There is no approximate (HNSW/IVFFlat) index on `embedding`: those scans apply
/// `WHERE` filters after collecting candidates, so a scoped or id-filtered search
/// could return fewer than `limit` rows or skip the true nearest match.
const SEED_INDEXES: [(&str, &str); 2] = [
    (
        "CREATE INDEX IF NOT EXISTS idx_seeds_scope ON seeds (app_id, external_user_id)",
        "Failed to create seeds scope index",
    ),
    (
        "CREATE INDEX IF NOT EXISTS idx_seeds_created_at ON seeds (created_at DESC)",
        "Failed to create seeds timestamp index",
    ),
];

/// Seed store on PostgreSQL with the `vector` extension.
///
/// Similarity is cosine: `1 - (embedding <=> probe)`.
pub struct PgvectorSeedStore {
    pool: PgPool,
    dimensions: usize,
}

impl Debug for PgvectorSeedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgvectorSeedStore")
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl PgvectorSeedStore {
    pub fn new(pool: PgPool, dimensions: usize) -> Self {
        Self { pool, dimensions }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the extension, tables and indexes if missing
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to create vector extension", e))?;

        sqlx::query(&seeds_table_ddl(self.dimensions))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to create seeds table", e))?;

        for (ddl, context) in SEED_INDEXES {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error(context, e))?;
        }

        tracing::info!(dimensions = self.dimensions, "Seed schema ready");
        Ok(())
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<(), DomainError> {
        if embedding.len() != self.dimensions {
            return Err(DomainError::validation(format!(
                "embedding has {} dimensions, store expects {}",
                embedding.len(),
                self.dimensions
            )));
        }

        Ok(())
    }
}

fn seeds_table_ddl(dimensions: usize) -> String {
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS seeds (
            id BIGSERIAL PRIMARY KEY,
            content TEXT NOT NULL,
            embedding vector({}) NOT NULL,
            metadata JSONB NOT NULL DEFAULT '{{}}',
            app_id TEXT NOT NULL DEFAULT '',
            external_user_id TEXT NOT NULL DEFAULT '',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        dimensions
    )
}

/// Ranked, filtered nearest-neighbor query.
///
/// The probe vector is always `$1`; optional restrictions are appended in the order
/// id set, app, external user, each only when present.
pub(crate) fn build_nearest_query(
    embedding: &[f32],
    limit: u32,
    filter: &SeedFilter,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT ");
    builder
        .push(SEED_COLUMNS)
        .push(", 1 - (embedding <=> ")
        .push_bind(embedding_to_pgvector(embedding))
        .push("::vector) AS score FROM seeds WHERE 1=1");

    if !filter.ids.is_empty() {
        let ids: Vec<i64> = filter.ids.iter().map(SeedId::as_i64).collect();
        builder.push(" AND id = ANY(").push_bind(ids).push(")");
    }

    push_scope(&mut builder, &filter.scope);

    builder
        .push(" ORDER BY embedding <=> $1::vector LIMIT ")
        .push_bind(i64::from(limit));

    builder
}

/// Chronological listing; no vector math, score fixed at 0
pub(crate) fn build_recent_query(limit: u32, scope: &Scope) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT ");
    builder
        .push(SEED_COLUMNS)
        .push(", 0::float8 AS score FROM seeds WHERE 1=1");

    push_scope(&mut builder, scope);

    builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(i64::from(limit));

    builder
}

fn push_scope(builder: &mut QueryBuilder<'static, Postgres>, scope: &Scope) {
    if let Some(app_id) = scope.app_id() {
        builder.push(" AND app_id = ").push_bind(app_id.to_string());
    }

    if let Some(user_id) = scope.external_user_id() {
        builder
            .push(" AND external_user_id = ")
            .push_bind(user_id.to_string());
    }
}

const TOUCH_AND_INCREMENT_SQL: &str = r#"
    UPDATE seeds
    SET created_at = NOW(),
        metadata = jsonb_set(
            COALESCE(metadata, '{}'::jsonb),
            ARRAY[$2::text],
            to_jsonb(
                CASE WHEN jsonb_typeof(metadata -> $2::text) = 'number'
                     THEN round((metadata ->> $2::text)::numeric)::bigint
                     ELSE 0
                END + 1
            )
        )
    WHERE id = $1
"#;

fn seed_from_row(row: &PgRow) -> Result<Seed, DomainError> {
    let decode = |e| map_sqlx_error("Failed to decode seed row", e);

    let id: i64 = row.try_get("id").map_err(decode)?;
    let content: String = row.try_get("content").map_err(decode)?;
    let metadata: serde_json::Value = row.try_get("metadata").map_err(decode)?;
    let app_id: String = row.try_get("app_id").map_err(decode)?;
    let external_user_id: String = row.try_get("external_user_id").map_err(decode)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
    let score: f64 = row.try_get("score").map_err(decode)?;

    Ok(Seed {
        id: SeedId::new(id),
        content,
        metadata: metadata_from_value(Some(metadata)).unwrap_or_default(),
        scope: Scope::new(Some(app_id), Some(external_user_id)),
        created_at,
        score,
    })
}

fn not_found(id: SeedId) -> DomainError {
    DomainError::not_found(format!("Seed {} not found", id))
}

#[async_trait]
impl VectorStore for PgvectorSeedStore {
    fn store_type(&self) -> &'static str {
        "pgvector"
    }

    async fn insert(&self, seed: NewSeed) -> Result<SeedId, DomainError> {
        self.check_dimensions(&seed.embedding)?;

        let row = sqlx::query(
            r#"
            INSERT INTO seeds (content, embedding, metadata, app_id, external_user_id)
            VALUES ($1, $2::vector, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&seed.content)
        .bind(embedding_to_pgvector(&seed.embedding))
        .bind(serde_json::Value::Object(seed.metadata))
        .bind(seed.scope.app_id().unwrap_or_default())
        .bind(seed.scope.external_user_id().unwrap_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Seed insert failed");
            map_sqlx_error("Failed to insert seed", e)
        })?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("Failed to read inserted seed id", e))?;

        Ok(SeedId::new(id))
    }

    async fn nearest_neighbor(&self, embedding: &[f32]) -> Result<Option<Neighbor>, DomainError> {
        self.check_dimensions(embedding)?;

        let row = sqlx::query(
            r#"
            SELECT id, 1 - (embedding <=> $1::vector) AS similarity
            FROM seeds
            ORDER BY embedding <=> $1::vector
            LIMIT 1
            "#,
        )
        .bind(embedding_to_pgvector(embedding))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Nearest-neighbor probe failed", e))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: i64 = row
            .try_get("id")
            .map_err(|e| map_sqlx_error("Failed to decode neighbor", e))?;
        let similarity: f64 = row
            .try_get("similarity")
            .map_err(|e| map_sqlx_error("Failed to decode neighbor", e))?;

        Ok(Some(Neighbor::new(SeedId::new(id), similarity)))
    }

    async fn touch_and_increment(&self, id: SeedId, counter_key: &str) -> Result<(), DomainError> {
        let result = sqlx::query(TOUCH_AND_INCREMENT_SQL)
            .bind(id.as_i64())
            .bind(counter_key)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to refresh seed", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }

    async fn query_nearest(
        &self,
        embedding: &[f32],
        limit: u32,
        filter: &SeedFilter,
    ) -> Result<Vec<Seed>, DomainError> {
        self.check_dimensions(embedding)?;

        let mut builder = build_nearest_query(embedding, limit, filter);
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Seed search failed");
                map_sqlx_error("Seed search failed", e)
            })?;

        rows.iter().map(seed_from_row).collect()
    }

    async fn query_recent(&self, limit: u32, scope: &Scope) -> Result<Vec<Seed>, DomainError> {
        let mut builder = build_recent_query(limit, scope);
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Recent seed listing failed", e))?;

        rows.iter().map(seed_from_row).collect()
    }

    async fn get(&self, id: SeedId) -> Result<Option<Seed>, DomainError> {
        let query = format!(
            "SELECT {}, 0::float8 AS score FROM seeds WHERE id = $1",
            SEED_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to get seed", e))?;

        row.as_ref().map(seed_from_row).transpose()
    }

    async fn update(&self, id: SeedId, seed: NewSeed) -> Result<(), DomainError> {
        self.check_dimensions(&seed.embedding)?;

        let result = sqlx::query(
            r#"
            UPDATE seeds
            SET content = $2, embedding = $3::vector, metadata = $4,
                app_id = $5, external_user_id = $6
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(&seed.content)
        .bind(embedding_to_pgvector(&seed.embedding))
        .bind(serde_json::Value::Object(seed.metadata))
        .bind(seed.scope.app_id().unwrap_or_default())
        .bind(seed.scope.external_user_id().unwrap_or_default())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to update seed", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }

    async fn patch_metadata(&self, id: SeedId, patch: &Metadata) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE seeds SET metadata = COALESCE(metadata, '{}'::jsonb) || $2 WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(serde_json::Value::Object(patch.clone()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to patch seed metadata", e))?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }

        Ok(())
    }

    async fn count(&self) -> Result<u64, DomainError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM seeds")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to count seeds", e))?;

        let count: i64 = row
            .try_get("count")
            .map_err(|e| map_sqlx_error("Failed to count seeds", e))?;

        Ok(count.max(0) as u64)
    }

    async fn health_check(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Health check failed", e))?;

        Ok(())
    }
}
