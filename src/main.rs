//! # FollowUp: lead lifecycle orchestration CLI
//!
//! Usage:
//!   followup run-cycle --owner 1              # Classify and contact every prospect of owner 1
//!   followup run-prospect --owner 1 --prospect 7 --context cold_mail
//!   followup channel-action --owner 1 --prospect 7 --template followup
//!   followup advance-sequences                # One sequence stepper pass
//!   followup serve                            # Cron loop (hourly sequences by default)
//!   followup import prospects.json            # Load sequences and prospects
//!   followup sequences list

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use followup_core::FollowUpConfig;
use followup_core::traits::ProspectStore;
use followup_core::types::{ContextTag, NewSequence};
use followup_engine::{Engine, EngineOptions, Scheduler};
use followup_store::SqliteStore;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "followup",
    version,
    about = "📬 FollowUp: classify prospects, compose outreach, step through sequences"
)]
struct Cli {
    /// Config file (default: ~/.followup/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Database path, overrides the config file
    #[arg(long, global = true)]
    database: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file and exit
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Process every prospect of an owner
    RunCycle {
        #[arg(long)]
        owner: i64,
    },
    /// Process a single prospect
    RunProspect {
        #[arg(long)]
        owner: i64,
        #[arg(long)]
        prospect: i64,
        /// Skip classification and compose under this context tag
        #[arg(long)]
        context: Option<String>,
    },
    /// Send a WhatsApp message to a prospect
    ChannelAction {
        #[arg(long)]
        owner: i64,
        #[arg(long)]
        prospect: i64,
        #[arg(long, default_value = "followup")]
        template: String,
    },
    /// Run one sequence stepper pass
    AdvanceSequences,
    /// Run scheduled jobs until interrupted
    Serve,
    /// Show recent activity for an owner
    Activity {
        #[arg(long)]
        owner: i64,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Import sequences and prospects from a JSON file
    Import { file: PathBuf },
    /// Manage sequences
    Sequences {
        #[command(subcommand)]
        action: SequenceCommand,
    },
}

#[derive(Subcommand)]
enum SequenceCommand {
    /// List sequences with their steps
    List,
    /// Create a sequence from a JSON file
    Create { file: PathBuf },
    /// Enroll a prospect (restarts at step 0)
    Attach {
        #[arg(long)]
        owner: i64,
        #[arg(long)]
        prospect: i64,
        #[arg(long)]
        name: String,
    },
    /// Remove a prospect from its sequence
    Detach {
        #[arg(long)]
        owner: i64,
        #[arg(long)]
        prospect: i64,
    },
    /// Delete a sequence and detach its prospects
    Delete { name: String },
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

fn load_config(cli: &Cli) -> Result<FollowUpConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = FollowUpConfig::load_from(std::path::Path::new(&expand_path(path)))?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => FollowUpConfig::load()?,
    };
    if let Some(db) = &cli.database {
        config.database.path = db.clone();
    }
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_engine(config: &FollowUpConfig, store: Arc<SqliteStore>) -> Result<Engine> {
    let composer = followup_providers::create_composer(&config.composer)?;
    if config.composer.api_key.is_empty() && config.composer.provider != "ollama" {
        tracing::warn!("⚠️  No composer API key set; messages will use fallback templates.");
    }

    let transports = followup_channels::transports_from_config(config);
    if transports.iter().all(|t| !t.is_configured()) {
        tracing::warn!("⚠️  No channel configured; every dispatch will be recorded as an error.");
    }

    Ok(Engine::new(
        store,
        Arc::from(composer),
        transports,
        EngineOptions::from(config),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "followup=debug,followup_engine=debug,followup_channels=debug,followup_providers=debug,followup_store=debug"
    } else {
        "followup=info,followup_engine=info,followup_channels=info,followup_providers=info,followup_store=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    if cli.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    if let Command::Init { force } = &cli.command {
        let path = FollowUpConfig::default_path();
        if path.exists() && !force {
            println!("⚠️  {} already exists (use --force to overwrite).", path.display());
            return Ok(());
        }
        FollowUpConfig::default().save()?;
        println!("✅ Config written to {}", path.display());
        return Ok(());
    }

    let config = load_config(&cli)?;
    let db_path = config.database_path();
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("opening database {}", db_path.display()))?,
    );
    tracing::debug!("Database: {}", db_path.display());

    match cli.command {
        Command::Init { .. } => {}
        Command::RunCycle { owner } => {
            let engine = build_engine(&config, store)?;
            print_json(&engine.run_cycle(owner).await?)?;
        }
        Command::RunProspect {
            owner,
            prospect,
            context,
        } => {
            let engine = build_engine(&config, store)?;
            let run = engine
                .run_for_prospect(owner, prospect, context.map(ContextTag::from))
                .await?;
            print_json(&run)?;
        }
        Command::ChannelAction {
            owner,
            prospect,
            template,
        } => {
            let engine = build_engine(&config, store)?;
            print_json(&engine.run_channel_action(owner, prospect, &template).await?)?;
        }
        Command::AdvanceSequences => {
            let engine = build_engine(&config, store)?;
            print_json(&engine.advance_sequences().await?)?;
        }
        Command::Serve => {
            let scheduler = Scheduler::from_config(&config.scheduler)?;
            let engine = Arc::new(build_engine(&config, store)?);
            tokio::select! {
                result = followup_engine::run_scheduler(engine, scheduler) => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("👋 Shutting down");
                }
            }
        }
        Command::Activity { owner, limit } => {
            print_json(&store.recent_activity(owner, limit).await?)?;
        }
        Command::Import { file } => {
            let summary = store.import_file(&file)?;
            println!(
                "✅ Imported {} sequences ({} skipped), {} prospects",
                summary.sequences_created, summary.sequences_skipped, summary.prospects_created
            );
        }
        Command::Sequences { action } => match action {
            SequenceCommand::List => print_json(&store.list_sequences()?)?,
            SequenceCommand::Create { file } => {
                let content = std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?;
                let sequence: NewSequence = serde_json::from_str(&content)?;
                let id = store.create_sequence(&sequence)?;
                println!("✅ Sequence '{}' created (id {id})", sequence.name);
            }
            SequenceCommand::Attach {
                owner,
                prospect,
                name,
            } => {
                store.attach_sequence(owner, prospect, &name)?;
                println!("✅ Prospect {prospect} enrolled in '{name}'");
            }
            SequenceCommand::Detach { owner, prospect } => {
                store.detach_sequence(owner, prospect)?;
                println!("✅ Prospect {prospect} removed from its sequence");
            }
            SequenceCommand::Delete { name } => {
                let detached = store.delete_sequence(&name)?;
                println!("🗑️  Sequence '{name}' deleted, {detached} prospects detached");
            }
        },
    }

    Ok(())
}
