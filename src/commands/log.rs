use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use garden_core::sync::{CallOutcome, Fields};
use garden_core::TaskLog;
use serde_json::Value;

use super::{AppContext, OutputFormat};

#[derive(Args)]
pub struct LogCommand {
    #[command(subcommand)]
    pub command: LogSubcommand,
}

#[derive(Subcommand)]
pub enum LogSubcommand {
    /// Record that a task was done
    Add {
        /// Task template ID
        task_id: String,

        /// Add notes to the log
        #[arg(long)]
        notes: Option<String>,
    },

    /// View completed tasks
    History {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show logs for this task
        #[arg(long)]
        task: Option<String>,
    },

    /// Delete a log entry
    Delete {
        /// Log ID
        id: String,
    },
}

impl LogCommand {
    pub async fn run(&self, ctx: &AppContext) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            LogSubcommand::Add { task_id, notes } => {
                let task = ctx
                    .repos
                    .tasks
                    .get(task_id)
                    .await?
                    .ok_or_else(|| format!("Task not found: {}", task_id))?;

                let mut log = TaskLog::new(&task.id);
                if let Some(plant_id) = &task.plant_id {
                    log = log.with_plant_id(plant_id);
                }
                if let Some(n) = notes {
                    log = log.with_notes(n);
                }

                let created = ctx.repos.task_logs.create(log).await?;
                println!("Logged: {}", task);

                // Nice to have; the log itself is what counts.
                let outcome = ctx
                    .repos
                    .tasks
                    .patch_metadata(&task.id, last_completed(created.completed_at))
                    .await?;
                if let CallOutcome::SoftFailed(e) = outcome {
                    eprintln!("Note: task not marked as completed remotely ({})", e);
                }
                Ok(())
            }
            LogSubcommand::History { format, task } => {
                let mut logs: Vec<TaskLog> = ctx
                    .repos
                    .task_logs
                    .list()
                    .await?
                    .into_iter()
                    .filter(|l| task.as_ref().map_or(true, |t| &l.template_id == t))
                    .collect();
                logs.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&logs)?);
                    }
                    OutputFormat::Text => {
                        if logs.is_empty() {
                            println!("No completed tasks found.");
                        }
                        for log in &logs {
                            println!("{}", log);
                        }
                    }
                }
                Ok(())
            }
            LogSubcommand::Delete { id } => {
                ctx.repos.task_logs.hard_delete(id).await?;
                println!("Deleted log: {}", id);
                Ok(())
            }
        }
    }
}

fn last_completed(at: DateTime<Utc>) -> Fields {
    let mut fields = Fields::new();
    fields.insert(
        "lastCompletedAt".to_string(),
        Value::String(at.to_rfc3339()),
    );
    fields
}
