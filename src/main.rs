use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;
mod remote;

use commands::{
    AppContext, BackupCommand, ConfigCommand, JournalCommand, LogCommand, PlantCommand,
    TaskCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "gardenlog")]
#[command(version)]
#[command(about = "A gardening tracker with offline-first sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage plants
    Plant(PlantCommand),

    /// Manage care task templates
    Task(TaskCommand),

    /// Record and review completed tasks
    Log(LogCommand),

    /// Manage journal entries
    Journal(JournalCommand),

    /// Export or import a backup
    Backup(BackupCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gardenlog=info,garden_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Plant(cmd)) => {
            let ctx = AppContext::open(&config).await?;
            cmd.run(&ctx).await?;
        }
        Some(Commands::Task(cmd)) => {
            let ctx = AppContext::open(&config).await?;
            cmd.run(&ctx).await?;
        }
        Some(Commands::Log(cmd)) => {
            let ctx = AppContext::open(&config).await?;
            cmd.run(&ctx).await?;
        }
        Some(Commands::Journal(cmd)) => {
            let ctx = AppContext::open(&config).await?;
            cmd.run(&ctx).await?;
        }
        Some(Commands::Backup(cmd)) => {
            let ctx = AppContext::open(&config).await?;
            cmd.run(&ctx).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
