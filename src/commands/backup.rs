use clap::{Args, Subcommand, ValueEnum};
use garden_core::{Backup, ImportMode};
use std::path::PathBuf;

use super::AppContext;

#[derive(Args)]
pub struct BackupCommand {
    #[command(subcommand)]
    pub command: BackupSubcommand,
}

#[derive(Clone, ValueEnum, Default)]
pub enum ModeArg {
    /// Replace local records with the backup
    #[default]
    Overwrite,
    /// Keep local records; backup records win on the same id
    Merge,
}

impl From<&ModeArg> for ImportMode {
    fn from(mode: &ModeArg) -> Self {
        match mode {
            ModeArg::Overwrite => ImportMode::Overwrite,
            ModeArg::Merge => ImportMode::Merge,
        }
    }
}

#[derive(Subcommand)]
pub enum BackupSubcommand {
    /// Export every record to a JSON file (photos are not included)
    Export {
        /// Output file
        path: PathBuf,
    },

    /// Import records from a backup file into the local cache
    Import {
        /// Backup file
        path: PathBuf,

        /// How imported records combine with local ones
        #[arg(long, value_enum, default_value = "overwrite")]
        mode: ModeArg,
    },
}

impl BackupCommand {
    pub async fn run(&self, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        let backup = Backup::new(ctx.repos.clone(), ctx.serializer.clone());

        match &self.command {
            BackupSubcommand::Export { path } => {
                let snapshot = backup.write_to(path).await?;
                println!("Exported backup to {}", path.display());
                println!(
                    "  {} plant(s), {} task(s), {} task log(s), {} journal entries",
                    snapshot.plants.len(),
                    snapshot.tasks.len(),
                    snapshot.task_logs.len(),
                    snapshot.journal.len()
                );
                Ok(())
            }
            BackupSubcommand::Import { path, mode } => {
                let summary = backup.read_from(path, mode.into()).await?;
                println!("Imported {} from {}", summary, path.display());
                Ok(())
            }
        }
    }
}
