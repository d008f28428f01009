//! Project Tracker - CLI
//!
//! Inspect stage readiness and bottlenecks of a project file, and edit stage
//! fields through the auto-save engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use project_tracker::activity::{self, ActivityLogger, EventBus, StaticUserProvider};
use project_tracker::autosave::{AutoSave, SaveStatus};
use project_tracker::project::{
    get_stage_readiness, identify_bottleneck, identify_bottlenecks, project_progress,
    FileProjectStore, StageField, StageId,
};
use project_tracker::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Stage readiness and bottleneck tracking for implementation projects")]
struct Cli {
    /// Path to the YAML config file (default: ./tracker.yaml)
    #[arg(long, global = true, env = "TRACKER_CONFIG")]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which stages can start
    Readiness {
        /// Project file, or a project name inside the data directory
        project: String,
    },

    /// Show stalled stages, most severe first
    Bottlenecks {
        /// Project file, or a project name inside the data directory
        project: String,
    },

    /// Set one stage field and save the project
    Set {
        /// Project file, or a project name inside the data directory
        project: String,
        /// infra, adherence, environment, conversion, implementation or post
        stage: StageId,
        /// status, responsible, startDate, endDate, observations, sentAt, approvedByInfra
        field: StageField,
        /// New value (dates as YYYY-MM-DD or RFC 3339; empty clears)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,project_tracker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Readiness { project } => run_readiness(&config, &project, cli.json).await,
        Commands::Bottlenecks { project } => run_bottlenecks(&config, &project, cli.json).await,
        Commands::Set {
            project,
            stage,
            field,
            value,
        } => run_set(config, &project, stage, field, &value, cli.json).await,
    }
}

async fn run_readiness(config: &Config, reference: &str, json: bool) -> Result<()> {
    let project = FileProjectStore::resolve(&config.data_dir, reference)
        .load()
        .await?;
    let readiness = get_stage_readiness(&project);

    if json {
        println!("{}", serde_json::to_string_pretty(&readiness)?);
        return Ok(());
    }

    let progress = project_progress(&project);
    println!(
        "{} ({}) - {}/{} stages done ({}%)",
        project.name, project.client_name, progress.done, progress.total, progress.percent
    );
    for r in readiness {
        let marker = if r.is_ready { "ready" } else { "-" };
        println!(
            "  {:<15} {:<12} {:<6} {}",
            r.stage,
            project.status(r.stage),
            marker,
            r.reason
        );
    }
    Ok(())
}

async fn run_bottlenecks(config: &Config, reference: &str, json: bool) -> Result<()> {
    let project = FileProjectStore::resolve(&config.data_dir, reference)
        .load()
        .await?;
    let issues = identify_bottlenecks(&project);
    let primary = identify_bottleneck(&project);

    if json {
        let out = serde_json::json!({ "primary": primary, "bottlenecks": issues });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if issues.is_empty() {
        println!("{}", primary.reason);
        return Ok(());
    }
    for issue in issues {
        let stage = issue.stage.map(|s| s.to_string()).unwrap_or_default();
        println!(
            "  {:<12} {:<7} {:>3} days  {}",
            stage,
            issue.severity.as_str(),
            issue.days_stuck,
            issue.reason
        );
    }
    Ok(())
}

async fn run_set(
    config: Config,
    reference: &str,
    stage: StageId,
    field: StageField,
    value: &str,
    json: bool,
) -> Result<()> {
    let bus = EventBus::default();
    let mut activity_rx = bus.subscribe();
    let logger = Arc::new(ActivityLogger::new(
        Arc::new(bus),
        Arc::new(StaticUserProvider::new(config.default_user.clone())),
        config.user_cache_ttl,
    ));
    let store = FileProjectStore::resolve(&config.data_dir, reference).with_activity(logger.clone());
    let project = store.load().await?;
    let project_id = project.id;
    let previous_status = project.status(stage);

    let engine = AutoSave::new(project, Arc::new(store), config.autosave.clone())?;
    engine
        .update_data(|p| p.set_stage_field(stage, field, value))
        .with_context(|| format!("Cannot set {stage} {field:?} to {value:?}"))?;

    let state = engine.flush_now().await;
    if state.status == SaveStatus::Error {
        anyhow::bail!(
            "{}",
            state.message.unwrap_or_else(|| "Failed to save project".into())
        );
    }

    let updated = engine.data();
    if updated.status(stage) != previous_status {
        logger
            .log_stage_status(project_id, stage, updated.status(stage))
            .await;
    }
    engine.close();

    let recorded = activity::drain(&mut activity_rx);
    for event in &recorded {
        tracing::info!(action = event.action.as_str(), "Activity: {}", event.summary());
    }

    if json {
        let out = serde_json::json!({
            "saveState": state,
            "readiness": get_stage_readiness(&updated),
            "activity": recorded,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if state.last_saved_at.is_some() && state.status == SaveStatus::Success {
        println!("Saved {stage} ({:?})", field);
    } else {
        println!("No changes");
    }
    for event in &recorded {
        println!("  activity: {}", event.summary());
    }
    Ok(())
}
