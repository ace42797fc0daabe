//! Command-line access to a Kokoro memory store.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use kokoro_rs::config::{KokoroConfig, MemoryBackend};
use kokoro_rs::memory::{MemoryCategory, MemoryId, MemoryStore, StoreOutcome};
use kokoro_rs::{KokoroError, init_logging, open_store};
use log::{debug, info};
use serde::Serialize;
use std::path::PathBuf;

/// Command-line options for the Kokoro CLI.
#[derive(Parser)]
#[command(name = "kokoro", version)]
struct Cli {
    /// Optional path to a kokoro.json5 config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the memory directory of the file backend
    #[arg(long, global = true)]
    memory_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Offer a memory candidate to the quality gate and store it if admitted
    Store {
        user: String,
        content: String,
        /// Category name, e.g. emotional_state or coping_methods
        #[arg(long, default_value = "other")]
        category: String,
        /// JSON metadata object; `timestamp` feeds the recency signal
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Recall memories relevant to a query
    Recall {
        user: String,
        query: String,
        /// Number of records; defaults to memory.recall.limit
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show per-user statistics
    Stats { user: String },
    /// List memories related to one memory
    Related {
        user: String,
        id: MemoryId,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Group similar memories within a category
    Consolidate { user: String, category: String },
    /// Relationship graph over the most important memories
    Graph { user: String },
    /// Digest of the most important memories
    Summary {
        user: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// List users with stored memories
    Users,
}

/// JSON shape printed by `store`.
#[derive(Serialize)]
struct StoreReport {
    stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<MemoryId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl From<StoreOutcome> for StoreReport {
    fn from(outcome: StoreOutcome) -> Self {
        match outcome {
            StoreOutcome::Stored(id) => Self {
                stored: true,
                id: Some(id),
                reason: None,
            },
            StoreOutcome::Rejected(reason) => Self {
                stored: false,
                id: None,
                reason: Some(reason.to_string()),
            },
        }
    }
}

/// Entry point for the Kokoro CLI.
fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    info!(
        "starting kokoro (config_set={}, memory_dir_set={})",
        cli.config.is_some(),
        cli.memory_dir.is_some()
    );

    let mut config = if let Some(path) = cli.config.as_ref() {
        KokoroConfig::load_from_path(path).context("failed to load config")?
    } else {
        let cwd = std::env::current_dir().context("cwd")?;
        let layered = KokoroConfig::load_layered(&cwd).context("failed to load layered config")?;
        debug!("layered config loaded (layers={})", layered.layers.len());
        layered.config
    };
    if let Some(dir) = cli.memory_dir.as_ref() {
        config.memory.provider = MemoryBackend::File;
        config.memory.path = Some(dir.to_string_lossy().into_owned());
    }

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(KokoroError::EmbedderRequired) => {
            bail!("semantic recall needs an embedder; set memory.recall.mode to \"keyword\"")
        }
        Err(err) => return Err(err).context("failed to open memory store"),
    };
    run(&store, &config, cli.command)
}

fn run(store: &MemoryStore, config: &KokoroConfig, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Store {
            user,
            content,
            category,
            metadata,
        } => {
            let metadata = match metadata {
                Some(raw) => serde_json::from_str(&raw).context("invalid --metadata JSON")?,
                None => serde_json::Value::Object(Default::default()),
            };
            let outcome = store.insert(&user, &content, MemoryCategory::parse(&category), metadata)?;
            print_json(&StoreReport::from(outcome))
        }
        Command::Recall { user, query, limit } => {
            let limit = limit.unwrap_or(config.memory.recall.limit);
            print_json(&store.retrieve_scored(&user, &query, limit)?)
        }
        Command::Stats { user } => print_json(&store.stats(&user)?),
        Command::Related { user, id, limit } => print_json(&store.related(&user, id, limit)?),
        Command::Consolidate { user, category } => {
            print_json(&store.consolidate(&user, &MemoryCategory::parse(&category))?)
        }
        Command::Graph { user } => print_json(&store.graph(&user)?),
        Command::Summary { user, category } => {
            let category = category.as_deref().map(MemoryCategory::parse);
            match store.summarize(&user, category.as_ref())? {
                Some(summary) => {
                    println!("{summary}");
                    Ok(())
                }
                None => {
                    println!("no memories recorded");
                    Ok(())
                }
            }
        }
        Command::Users => print_json(&store.users()?),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
