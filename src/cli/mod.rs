//! CLI module for Seedbank
//!
//! Every subcommand prints its result as pretty JSON on stdout; logs go to stderr.

pub mod context;
pub mod seed;

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::domain::Scope;
use crate::infrastructure::logging::init_logging;
use crate::state::AppState;

/// Seedbank - Semantic seed memory over PostgreSQL/pgvector
#[derive(Parser, Debug)]
#[command(name = "seedbank")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Store a seed, merging it into a near-duplicate when dedupe is enabled
    Store(seed::StoreArgs),

    /// Similarity search returning full seeds (default limit 10)
    Search(seed::SearchArgs),

    /// Similarity search returning compact results (default limit 30)
    Query(seed::SearchArgs),

    /// Most recently created seeds
    Recent(seed::RecentArgs),

    /// Show one seed
    Get(seed::GetArgs),

    /// Replace a seed's content and metadata
    Update(seed::UpdateArgs),

    /// Merge a JSON object into a seed's metadata
    PatchMetadata(seed::PatchMetadataArgs),

    /// Replace a seed's tags
    Tags(seed::TagsArgs),

    /// Agent context commands
    #[command(subcommand)]
    Context(context::ContextCommand),

    /// Row counts for seeds and agent contexts
    Stats,

    /// Check the database is reachable
    Health,
}

/// Optional tenant/user scope shared by several commands
#[derive(Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    #[arg(long)]
    pub app_id: Option<String>,

    #[arg(long)]
    pub external_user_id: Option<String>,
}

impl From<ScopeArgs> for Scope {
    fn from(args: ScopeArgs) -> Self {
        Scope::new(args.app_id, args.external_user_id)
    }
}

/// Parse a JSON argument value
pub fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {}", e))
}

/// Load configuration, wire the services and run one command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    let state = crate::create_app_state(&config).await?;
    let output = execute(&state, cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Run one command against the given state and return its JSON output
pub async fn execute(state: &AppState, command: Command) -> anyhow::Result<Value> {
    match command {
        Command::Store(args) => seed::store(&state.seeds, args).await,
        Command::Search(args) => seed::search(&state.seeds, args).await,
        Command::Query(args) => seed::query(&state.seeds, args).await,
        Command::Recent(args) => seed::recent(&state.seeds, args).await,
        Command::Get(args) => seed::get(&state.seeds, args).await,
        Command::Update(args) => seed::update(&state.seeds, args).await,
        Command::PatchMetadata(args) => seed::patch_metadata(&state.seeds, args).await,
        Command::Tags(args) => seed::tags(&state.seeds, args).await,
        Command::Context(command) => context::run(&state.contexts, command).await,
        Command::Stats => Ok(serde_json::to_value(state.stats().await?)?),
        Command::Health => {
            state.health_check().await?;
            Ok(json!({"status": "ok"}))
        }
    }
}
