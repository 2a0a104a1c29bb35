use clap::{Args, Subcommand};
use garden_core::models::PLANT_MEDIA_DIR;
use garden_core::sync::PageRequest;
use garden_core::Plant;
use std::path::PathBuf;

use super::{import_photo, parse_date, AppContext, OutputFormat};

#[derive(Args)]
pub struct PlantCommand {
    #[command(subcommand)]
    pub command: PlantSubcommand,
}

#[derive(Subcommand)]
pub enum PlantSubcommand {
    /// Add a new plant
    Add {
        /// Plant name
        name: String,

        /// Species (e.g., "Solanum lycopersicum")
        #[arg(long)]
        species: Option<String>,

        /// Variety or cultivar
        #[arg(long)]
        variety: Option<String>,

        /// Where the plant grows (bed, pot, windowsill...)
        #[arg(long)]
        location: Option<String>,

        /// Planting date (YYYY-MM-DD)
        #[arg(long)]
        planted: Option<String>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,

        /// Photo file to attach (can be repeated)
        #[arg(long = "photo", value_name = "FILE")]
        photos: Vec<PathBuf>,
    },

    /// List plants
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Skip this many plants
        #[arg(long)]
        offset: Option<usize>,

        /// Show at most this many plants
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show plant details
    Show {
        /// Plant ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Update a plant
    Update {
        /// Plant ID
        id: String,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New location
        #[arg(long)]
        location: Option<String>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,

        /// Photo file to attach (can be repeated)
        #[arg(long = "photo", value_name = "FILE")]
        photos: Vec<PathBuf>,
    },

    /// Move a plant to the trash
    Delete {
        /// Plant ID
        id: String,
    },

    /// Restore a plant from the trash
    Restore {
        /// Plant ID
        id: String,
    },

    /// List plants in the trash
    Trash {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Permanently delete a plant and its photos
    Purge {
        /// Plant ID
        id: String,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

impl PlantCommand {
    pub async fn run(&self, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        let repo = &ctx.repos.plants;

        match &self.command {
            PlantSubcommand::Add {
                name,
                species,
                variety,
                location,
                planted,
                notes,
                photos,
            } => {
                let mut plant = Plant::new(name);
                if let Some(s) = species {
                    plant = plant.with_species(s);
                }
                if let Some(v) = variety {
                    plant = plant.with_variety(v);
                }
                if let Some(l) = location {
                    plant = plant.with_location(l);
                }
                if let Some(p) = planted {
                    plant = plant.with_planted_on(parse_date(p)?);
                }
                if let Some(n) = notes {
                    plant = plant.with_notes(n);
                }
                for path in photos {
                    let photo = import_photo(&ctx.media, path, PLANT_MEDIA_DIR).await?;
                    plant = plant.with_photo(photo.filename);
                }

                let created = repo.create(plant).await?;
                println!("Added plant: {} ({})", created.name, created.id);
                Ok(())
            }
            PlantSubcommand::List {
                format,
                offset,
                limit,
            } => {
                let plants = match (offset, limit) {
                    (None, None) => repo.list().await?,
                    _ => {
                        let page = PageRequest::new(offset.unwrap_or(0), limit.unwrap_or(50));
                        repo.list_page(page).await?
                    }
                };
                print_plants(&plants, format)
            }
            PlantSubcommand::Show { id, format } => {
                let plant = repo
                    .get(id)
                    .await?
                    .ok_or_else(|| format!("Plant not found: {}", id))?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plant)?),
                    OutputFormat::Text => {
                        print!("{}", plant);
                        for photo in &plant.photos {
                            match &photo.resolved_uri {
                                Some(uri) => println!("  {}", uri),
                                None => println!("  {} (missing)", photo.filename),
                            }
                        }
                    }
                }
                Ok(())
            }
            PlantSubcommand::Update {
                id,
                name,
                location,
                notes,
                photos,
            } => {
                let mut plant = repo
                    .get(id)
                    .await?
                    .ok_or_else(|| format!("Plant not found: {}", id))?;

                if let Some(n) = name {
                    plant.name = n.clone();
                }
                if let Some(l) = location {
                    plant.location = Some(l.clone());
                }
                if let Some(n) = notes {
                    plant.notes = Some(n.clone());
                }
                for path in photos {
                    let photo = import_photo(&ctx.media, path, PLANT_MEDIA_DIR).await?;
                    plant.photo_filenames.push(photo.filename);
                }
                plant.updated_at = chrono::Utc::now();

                let updated = repo.update(&plant).await?;
                println!("Updated plant: {}", updated.name);
                Ok(())
            }
            PlantSubcommand::Delete { id } => {
                repo.soft_delete(id).await?;
                println!("Moved plant to trash: {}", id);
                Ok(())
            }
            PlantSubcommand::Restore { id } => {
                let plant = repo.restore(id).await?;
                println!("Restored plant: {}", plant.name);
                Ok(())
            }
            PlantSubcommand::Trash { format } => {
                let plants = repo.list_deleted().await?;
                print_plants(&plants, format)
            }
            PlantSubcommand::Purge { id, force } => {
                if !force {
                    return Err(format!(
                        "Permanently deleting plant {} removes its photos. Re-run with --force to confirm.",
                        id
                    )
                    .into());
                }
                repo.hard_delete(id).await?;
                println!("Permanently deleted plant: {}", id);
                Ok(())
            }
        }
    }
}

fn print_plants(plants: &[Plant], format: &OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(plants)?);
        }
        OutputFormat::Text => {
            if plants.is_empty() {
                println!("No plants found.");
                return Ok(());
            }
            println!("{:<38} {:<24} {:<20}", "ID", "NAME", "LOCATION");
            println!("{}", "-".repeat(82));
            for plant in plants {
                println!(
                    "{:<38} {:<24} {:<20}",
                    plant.id,
                    truncate(&plant.name, 24),
                    truncate(plant.location.as_deref().unwrap_or("-"), 20)
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
