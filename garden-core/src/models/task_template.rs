use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::sync::entity::{decode_fields, non_empty};
use crate::sync::{Entity, RemoteDocument, SyncError};

/// Kind of care a task template describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Watering,
    Fertilizing,
    Pruning,
    Repotting,
    Harvesting,
    PestControl,
    Other,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Watering => write!(f, "watering"),
            TaskType::Fertilizing => write!(f, "fertilizing"),
            TaskType::Pruning => write!(f, "pruning"),
            TaskType::Repotting => write!(f, "repotting"),
            TaskType::Harvesting => write!(f, "harvesting"),
            TaskType::PestControl => write!(f, "pest_control"),
            TaskType::Other => write!(f, "other"),
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "watering" => Ok(TaskType::Watering),
            "fertilizing" => Ok(TaskType::Fertilizing),
            "pruning" => Ok(TaskType::Pruning),
            "repotting" => Ok(TaskType::Repotting),
            "harvesting" => Ok(TaskType::Harvesting),
            "pest_control" => Ok(TaskType::PestControl),
            "other" => Ok(TaskType::Other),
            _ => Err(format!(
                "Invalid task type '{}'. Valid options: watering, fertilizing, pruning, \
                 repotting, harvesting, pest_control, other",
                s
            )),
        }
    }
}

/// A recurring care task, optionally tied to one plant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub title: String,
    pub plant_id: Option<String>,
    pub frequency_days: Option<u32>,
    pub notes: Option<String>,
    pub active: bool,
    pub last_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TaskTemplateDocument {
    #[serde(rename = "type")]
    task_type: Option<String>,
    title: Option<String>,
    plant_id: Option<String>,
    frequency_days: Option<u32>,
    notes: Option<String>,
    active: Option<bool>,
    last_completed_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
}

impl TaskTemplate {
    pub fn new(task_type: TaskType, title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            task_type,
            title: title.into(),
            plant_id: None,
            frequency_days: None,
            notes: None,
            active: true,
            last_completed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_plant_id(mut self, plant_id: impl Into<String>) -> Self {
        self.plant_id = Some(plant_id.into());
        self
    }

    pub fn with_frequency_days(mut self, days: u32) -> Self {
        self.frequency_days = Some(days);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Entity for TaskTemplate {
    const COLLECTION: &'static str = "tasks";
    const CACHE_KEY: &'static str = "tasks";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_remote(doc: RemoteDocument) -> Result<Self, SyncError> {
        let RemoteDocument { id, fields } = doc;
        let doc: TaskTemplateDocument = decode_fields(fields)?;

        // Unknown kinds from newer clients fall back to `other`.
        let task_type = doc
            .task_type
            .as_deref()
            .and_then(|t| TaskType::from_str(t).ok())
            .unwrap_or(TaskType::Other);

        Ok(Self {
            id,
            task_type,
            title: doc.title.unwrap_or_default(),
            plant_id: non_empty(doc.plant_id),
            frequency_days: doc.frequency_days.filter(|days| *days > 0),
            notes: non_empty(doc.notes),
            active: doc.active.unwrap_or(true),
            last_completed_at: doc.last_completed_at,
            created_at: doc.created_at.unwrap_or_default(),
        })
    }
}

impl fmt::Display for TaskTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.task_type, self.title)?;
        if let Some(days) = self.frequency_days {
            write!(f, " (every {} day(s))", days)?;
        }
        if !self.active {
            write!(f, " (paused)")?;
        }
        Ok(())
    }
}
