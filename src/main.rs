//! Pipestore CLI - inspect a pipeline store

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use pipestore::PipelineStore;
use pipestore::config::{self, PipestoreConfig};
use pipestore::storage::SyncMode;
use pipestore::storage::engine::DEFAULT_BUSY_TIMEOUT_MS;
use pipestore::ui::{self, Icons};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pipestore")]
#[command(version)]
#[command(about = "Embedded persistence for pipeline definitions and run history")]
#[command(long_about = r#"
Pipestore keeps pending pipelines, compiled pipelines and their run history
in a single embedded database. This tool inspects that database.

Example usage:
  pipestore init
  pipestore stats
  pipestore find build
  pipestore history 1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show entry counts per partition
    Stats,

    /// List pipelines waiting for compilation
    Pending,

    /// Look up a compiled pipeline by name
    Find {
        /// Pipeline name
        name: String,
    },

    /// Show the run history of a pipeline
    History {
        /// Pipeline id
        pipeline_id: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    match cli.command {
        Commands::Init { force } => {
            let config = PipestoreConfig {
                database: Some(".pipestore/pipestore.db".to_string()),
                busy_timeout_ms: Some(DEFAULT_BUSY_TIMEOUT_MS),
                sync_mode: Some(SyncMode::Full),
            };
            config::write_config(&config_path, &config, force)?;
            ui::success(&format!("Wrote {}", config_path.display()));
        }

        Commands::Stats => {
            let (store, database) = open_store(&config_path, cli.database)?;
            let stats = store.stats()?;
            ui::header(Icons::STATS, &format!("Pipestore Statistics ({})", database.display()));
            println!(
                "{}",
                ui::stats_table(&[
                    ("Pending pipelines", stats.pending.to_string().as_str()),
                    ("Pipelines", stats.pipelines.to_string().as_str()),
                    ("Run histories", stats.histories.to_string().as_str()),
                    ("Next pipeline id", stats.next_pipeline_id.to_string().as_str()),
                ])
            );
        }

        Commands::Pending => {
            let (store, _) = open_store(&config_path, cli.database)?;
            let pending = store.list_pending()?;
            if pending.is_empty() {
                println!("{} {}", Icons::EMPTY, ui::dim("No pending pipelines."));
            } else {
                ui::header(Icons::HOURGLASS, &format!("{} pending pipelines", pending.len()));
                println!("{}", ui::pending_table(&pending));
                ui::state_summary(&pending);
            }
        }

        Commands::Find { name } => {
            let (store, _) = open_store(&config_path, cli.database)?;
            match store.get_pipeline_by_name(&name)? {
                Some(pipeline) => {
                    ui::info("Pipeline", &format!("#{} {}", pipeline.id, pipeline.name));
                    println!("{}", serde_json::to_string_pretty(&pipeline)?);
                }
                None => ui::warn(&format!("No pipeline named '{}'", name)),
            }
        }

        Commands::History { pipeline_id } => {
            let (store, _) = open_store(&config_path, cli.database)?;
            match store.get_run_history_by_id(pipeline_id)? {
                Some(history) => {
                    ui::header(
                        Icons::HOURGLASS,
                        &format!("Pipeline {}: {} runs", pipeline_id, history.runs.len()),
                    );
                    for run in &history.runs {
                        ui::run_line(run);
                    }
                }
                None => println!(
                    "{} {}",
                    Icons::EMPTY,
                    ui::muted(&format!("Pipeline {} has no runs yet.", pipeline_id))
                ),
            }
        }
    }

    Ok(())
}

/// Open the store named by `--database`, else by the config file.
///
/// Relative paths in the config are resolved against the config's directory.
fn open_store(config_path: &Path, database: Option<PathBuf>) -> anyhow::Result<(PipelineStore, PathBuf)> {
    let config = config::load_config(Some(config_path))?.unwrap_or_default();
    let base = config_path.parent().map(PathBuf::from).unwrap_or_default();
    let database = database.unwrap_or_else(|| config.database_path_in(&base));

    tracing::info!("Opening store at {}", database.display());
    let store = PipelineStore::open(&database, config.engine_options())?;
    Ok((store, database))
}
