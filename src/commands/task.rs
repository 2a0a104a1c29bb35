use clap::{Args, Subcommand};
use garden_core::{TaskTemplate, TaskType};

use super::plant::truncate;
use super::{AppContext, OutputFormat};

#[derive(Args)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub command: TaskSubcommand,
}

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Add a care task template
    Add {
        /// Task title
        title: String,

        /// Task type (watering, fertilizing, pruning, repotting, harvesting, pest_control, other)
        #[arg(long = "type", short = 't', value_name = "TYPE", default_value = "other")]
        task_type: String,

        /// Plant ID the task belongs to
        #[arg(long)]
        plant: Option<String>,

        /// Repeat every N days
        #[arg(long, value_name = "DAYS")]
        every: Option<u32>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List task templates
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show tasks for this plant
        #[arg(long)]
        plant: Option<String>,
    },

    /// Update a task template
    Update {
        /// Task ID
        id: String,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// Repeat every N days
        #[arg(long, value_name = "DAYS")]
        every: Option<u32>,

        /// New notes
        #[arg(long)]
        notes: Option<String>,

        /// Pause the task
        #[arg(long, conflicts_with = "resume")]
        pause: bool,

        /// Resume a paused task
        #[arg(long)]
        resume: bool,
    },

    /// Delete a task template
    Delete {
        /// Task ID
        id: String,
    },
}

impl TaskCommand {
    pub async fn run(&self, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        let repo = &ctx.repos.tasks;

        match &self.command {
            TaskSubcommand::Add {
                title,
                task_type,
                plant,
                every,
                notes,
            } => {
                let task_type: TaskType = task_type.parse().map_err(|e: String| e)?;
                let mut task = TaskTemplate::new(task_type, title);
                if let Some(p) = plant {
                    task = task.with_plant_id(p);
                }
                if let Some(days) = every {
                    task = task.with_frequency_days(*days);
                }
                if let Some(n) = notes {
                    task = task.with_notes(n);
                }

                let created = repo.create(task).await?;
                println!("Added task: {} ({})", created, created.id);
                Ok(())
            }
            TaskSubcommand::List { format, plant } => {
                let tasks: Vec<TaskTemplate> = repo
                    .list()
                    .await?
                    .into_iter()
                    .filter(|t| plant.is_none() || t.plant_id.as_ref() == plant.as_ref())
                    .collect();

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&tasks)?);
                    }
                    OutputFormat::Text => {
                        if tasks.is_empty() {
                            println!("No tasks found.");
                            return Ok(());
                        }
                        println!("{:<38} {:<12} {:<28} {:<8}", "ID", "TYPE", "TITLE", "EVERY");
                        println!("{}", "-".repeat(88));
                        for task in &tasks {
                            let every = task
                                .frequency_days
                                .map(|d| format!("{}d", d))
                                .unwrap_or_else(|| "-".to_string());
                            println!(
                                "{:<38} {:<12} {:<28} {:<8}",
                                task.id,
                                task.task_type.to_string(),
                                truncate(&task.title, 28),
                                every
                            );
                        }
                    }
                }
                Ok(())
            }
            TaskSubcommand::Update {
                id,
                title,
                every,
                notes,
                pause,
                resume,
            } => {
                let mut task = repo
                    .get(id)
                    .await?
                    .ok_or_else(|| format!("Task not found: {}", id))?;

                if let Some(t) = title {
                    task.title = t.clone();
                }
                if let Some(days) = every {
                    task.frequency_days = Some(*days);
                }
                if let Some(n) = notes {
                    task.notes = Some(n.clone());
                }
                if *pause {
                    task.active = false;
                }
                if *resume {
                    task.active = true;
                }

                let updated = repo.update(&task).await?;
                println!("Updated task: {}", updated);
                Ok(())
            }
            TaskSubcommand::Delete { id } => {
                repo.hard_delete(id).await?;
                println!("Deleted task: {}", id);
                Ok(())
            }
        }
    }
}
