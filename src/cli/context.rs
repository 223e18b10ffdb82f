//! Agent context commands

use clap::{Args, Subcommand};
use serde_json::{json, Value};

use super::{parse_json, ScopeArgs};
use crate::infrastructure::services::{ContextService, CreateContextRequest, ListContextsRequest};

#[derive(Subcommand, Debug, Clone)]
pub enum ContextCommand {
    /// Store an agent context
    Create(CreateArgs),

    /// List agent contexts, oldest first
    List(ListArgs),

    /// Show one agent context
    Get(GetArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[arg(long)]
    pub agent_id: String,

    /// episodic, semantic, procedural or working
    #[arg(long)]
    pub memory_type: String,

    /// Context payload as JSON
    #[arg(long, value_parser = parse_json)]
    pub payload: Option<Value>,

    /// Alternative to --payload
    #[arg(long, value_parser = parse_json)]
    pub data: Option<Value>,

    /// JSON object folded into the payload as `metadata_<key>`
    #[arg(long, value_parser = parse_json)]
    pub metadata: Option<Value>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(long)]
    pub agent_id: Option<String>,

    #[arg(long)]
    pub memory_type: Option<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    pub id: String,
}

pub async fn run(service: &ContextService, command: ContextCommand) -> anyhow::Result<Value> {
    match command {
        ContextCommand::Create(args) => {
            let id = service
                .create(CreateContextRequest {
                    agent_id: args.agent_id,
                    memory_type: args.memory_type,
                    payload: args.payload,
                    data: args.data,
                    metadata: args.metadata,
                    scope: args.scope.into(),
                })
                .await?;

            Ok(json!({ "id": id }))
        }
        ContextCommand::List(args) => {
            let contexts = service
                .list(ListContextsRequest {
                    agent_id: args.agent_id,
                    memory_type: args.memory_type,
                    scope: args.scope.into(),
                })
                .await?;

            Ok(serde_json::to_value(contexts)?)
        }
        ContextCommand::Get(args) => Ok(serde_json::to_value(service.get(&args.id).await?)?),
    }
}
