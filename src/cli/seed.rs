//! Seed commands - store, search, list and maintain seeds

use clap::Args;
use serde::Serialize;
use serde_json::{json, Value};

use super::{parse_json, ScopeArgs};
use crate::domain::{Seed, SeedId};
use crate::infrastructure::services::{SearchSeedsRequest, SeedService, StoreSeedRequest};

/// Arguments for `store`
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Seed text
    pub content: String,

    /// Metadata as a JSON object
    #[arg(long, value_parser = parse_json)]
    pub metadata: Option<Value>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Arguments for `search` and `query`
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Text to search for
    pub query: String,

    /// Maximum number of results (`query` caps it at 100)
    #[arg(long, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Minimum similarity; negative disables
    #[arg(long, allow_negative_numbers = true)]
    pub threshold: Option<f64>,

    /// Restrict to these seed ids, e.g. `1,2,3`
    #[arg(long)]
    pub seed_ids: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Arguments for `recent`
#[derive(Args, Debug, Clone)]
pub struct RecentArgs {
    /// Maximum number of results
    #[arg(long, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Arguments for `get`
#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    pub id: String,
}

/// Arguments for `update`
#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    pub id: String,

    /// Replacement text; the embedding is recomputed
    pub content: String,

    /// Replacement metadata as a JSON object
    #[arg(long, value_parser = parse_json)]
    pub metadata: Option<Value>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

/// Arguments for `patch-metadata`
#[derive(Args, Debug, Clone)]
pub struct PatchMetadataArgs {
    pub id: String,

    /// JSON object merged into the stored metadata
    #[arg(value_parser = parse_json)]
    pub patch: Value,
}

/// Arguments for `tags`
#[derive(Args, Debug, Clone)]
pub struct TagsArgs {
    pub id: String,

    /// Tags replacing the seed's current tags
    pub tags: Vec<String>,
}

/// Compact search hit returned by `query`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedQueryResult {
    pub seed_id: String,
    pub content: String,
    pub similarity: f64,
}

impl From<Seed> for SeedQueryResult {
    fn from(seed: Seed) -> Self {
        Self {
            seed_id: seed.id.to_string(),
            content: seed.content,
            similarity: seed.score,
        }
    }
}

/// Parse a comma-separated id list, skipping entries that are not valid ids
pub fn parse_seed_ids(raw: &str) -> Vec<SeedId> {
    raw.split(',')
        .filter_map(|part| SeedId::parse(part).ok())
        .collect()
}

impl SearchArgs {
    fn into_request(self) -> SearchSeedsRequest {
        SearchSeedsRequest {
            query: self.query,
            limit: self.limit,
            threshold: self.threshold,
            seed_ids: self.seed_ids.as_deref().map(parse_seed_ids).unwrap_or_default(),
            scope: self.scope.into(),
        }
    }
}

fn ok() -> Value {
    json!({"status": "ok"})
}

pub async fn store(service: &SeedService, args: StoreArgs) -> anyhow::Result<Value> {
    let request = StoreSeedRequest {
        content: args.content,
        metadata: args.metadata,
        scope: args.scope.into(),
    };

    Ok(serde_json::to_value(service.store(request).await?)?)
}

pub async fn search(service: &SeedService, args: SearchArgs) -> anyhow::Result<Value> {
    let seeds = service.search(args.into_request()).await?;
    Ok(serde_json::to_value(seeds)?)
}

pub async fn query(service: &SeedService, args: SearchArgs) -> anyhow::Result<Value> {
    let results: Vec<SeedQueryResult> = service
        .query(args.into_request())
        .await?
        .into_iter()
        .map(SeedQueryResult::from)
        .collect();

    Ok(json!({ "results": results }))
}

pub async fn recent(service: &SeedService, args: RecentArgs) -> anyhow::Result<Value> {
    let seeds = service.recent(args.limit, args.scope.into()).await?;
    Ok(serde_json::to_value(seeds)?)
}

pub async fn get(service: &SeedService, args: GetArgs) -> anyhow::Result<Value> {
    let seed = service.get(SeedId::parse(&args.id)?).await?;
    Ok(serde_json::to_value(seed)?)
}

pub async fn update(service: &SeedService, args: UpdateArgs) -> anyhow::Result<Value> {
    let id = SeedId::parse(&args.id)?;
    let request = StoreSeedRequest {
        content: args.content,
        metadata: args.metadata,
        scope: args.scope.into(),
    };

    service.update(id, request).await?;
    Ok(ok())
}

pub async fn patch_metadata(service: &SeedService, args: PatchMetadataArgs) -> anyhow::Result<Value> {
    service
        .patch_metadata(SeedId::parse(&args.id)?, args.patch)
        .await?;
    Ok(ok())
}

pub async fn tags(service: &SeedService, args: TagsArgs) -> anyhow::Result<Value> {
    service.set_tags(SeedId::parse(&args.id)?, args.tags).await?;
    Ok(ok())
}
