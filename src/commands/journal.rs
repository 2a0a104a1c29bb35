use clap::{Args, Subcommand};
use garden_core::models::JOURNAL_MEDIA_DIR;
use garden_core::{EntryType, JournalEntry};
use std::path::PathBuf;

use super::plant::truncate;
use super::{import_photo, parse_date, AppContext, OutputFormat};

#[derive(Args)]
pub struct JournalCommand {
    #[command(subcommand)]
    pub command: JournalSubcommand,
}

#[derive(Subcommand)]
pub enum JournalSubcommand {
    /// Write a journal entry
    Add {
        /// Entry title
        title: String,

        /// Entry type (observation, harvest, milestone, problem, note)
        #[arg(long = "type", short = 't', value_name = "TYPE", default_value = "note")]
        entry_type: String,

        /// Plant ID the entry is about
        #[arg(long)]
        plant: Option<String>,

        /// Entry text
        #[arg(long)]
        body: Option<String>,

        /// Entry date (YYYY-MM-DD), defaults to today
        #[arg(long, short)]
        date: Option<String>,

        /// Photo file to attach (can be repeated)
        #[arg(long = "photo", value_name = "FILE")]
        photos: Vec<PathBuf>,
    },

    /// List journal entries, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show entries about this plant
        #[arg(long)]
        plant: Option<String>,
    },

    /// Show a journal entry
    Show {
        /// Entry ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a journal entry and its photos
    Delete {
        /// Entry ID
        id: String,
    },
}

impl JournalCommand {
    pub async fn run(&self, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        let repo = &ctx.repos.journal;

        match &self.command {
            JournalSubcommand::Add {
                title,
                entry_type,
                plant,
                body,
                date,
                photos,
            } => {
                let entry_type: EntryType = entry_type.parse().map_err(|e: String| e)?;
                let mut entry = JournalEntry::new(entry_type, title);
                if let Some(p) = plant {
                    entry = entry.with_plant_id(p);
                }
                if let Some(b) = body {
                    entry = entry.with_body(b);
                }
                if let Some(d) = date {
                    entry = entry.with_entry_date(parse_date(d)?);
                }
                for path in photos {
                    let photo = import_photo(&ctx.media, path, JOURNAL_MEDIA_DIR).await?;
                    entry = entry.with_photo(photo.filename);
                }

                let created = repo.create(entry).await?;
                println!("Added journal entry: {} ({})", created.title, created.id);
                Ok(())
            }
            JournalSubcommand::List { format, plant } => {
                let mut entries: Vec<JournalEntry> = repo
                    .list()
                    .await?
                    .into_iter()
                    .filter(|e| plant.is_none() || e.plant_id.as_ref() == plant.as_ref())
                    .collect();
                entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date));

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&entries)?);
                    }
                    OutputFormat::Text => {
                        if entries.is_empty() {
                            println!("No journal entries found.");
                            return Ok(());
                        }
                        println!("{:<38} {:<10} {:<12} {:<30}", "ID", "DATE", "TYPE", "TITLE");
                        println!("{}", "-".repeat(92));
                        for entry in &entries {
                            println!(
                                "{:<38} {:<10} {:<12} {:<30}",
                                entry.id,
                                entry.entry_date.to_string(),
                                entry.entry_type.to_string(),
                                truncate(&entry.title, 30)
                            );
                        }
                    }
                }
                Ok(())
            }
            JournalSubcommand::Show { id, format } => {
                let entry = repo
                    .get(id)
                    .await?
                    .ok_or_else(|| format!("Journal entry not found: {}", id))?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entry)?),
                    OutputFormat::Text => {
                        print!("{}", entry);
                        for photo in &entry.photos {
                            match &photo.resolved_uri {
                                Some(uri) => println!("  {}", uri),
                                None => println!("  {} (missing)", photo.filename),
                            }
                        }
                    }
                }
                Ok(())
            }
            JournalSubcommand::Delete { id } => {
                repo.hard_delete(id).await?;
                println!("Deleted journal entry: {}", id);
                Ok(())
            }
        }
    }
}
