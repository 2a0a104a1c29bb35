use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::sync::entity::{decode_fields, non_empty};
use crate::sync::{Entity, RemoteDocument, SyncError};

/// A record of a care task actually carried out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLog {
    pub id: String,
    pub template_id: String,
    pub plant_id: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TaskLogDocument {
    template_id: Option<String>,
    plant_id: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl TaskLog {
    /// Logs completion of `template_id` now.
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            template_id: template_id.into(),
            plant_id: None,
            completed_at: Utc::now(),
            notes: None,
        }
    }

    pub fn with_plant_id(mut self, plant_id: impl Into<String>) -> Self {
        self.plant_id = Some(plant_id.into());
        self
    }

    pub fn with_completed_at(mut self, completed_at: DateTime<Utc>) -> Self {
        self.completed_at = completed_at;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

impl Entity for TaskLog {
    const COLLECTION: &'static str = "taskLogs";
    const CACHE_KEY: &'static str = "task_logs";

    fn id(&self) -> &str {
        &self.id
    }

    fn from_remote(doc: RemoteDocument) -> Result<Self, SyncError> {
        let RemoteDocument { id, fields } = doc;
        let doc: TaskLogDocument = decode_fields(fields)?;

        Ok(Self {
            id,
            template_id: doc.template_id.unwrap_or_default(),
            plant_id: non_empty(doc.plant_id),
            completed_at: doc.completed_at.unwrap_or_default(),
            notes: non_empty(doc.notes),
        })
    }
}

impl fmt::Display for TaskLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} task {}",
            self.completed_at.format("%Y-%m-%d %H:%M"),
            self.template_id
        )?;
        if let Some(notes) = &self.notes {
            write!(f, " - {}", notes)?;
        }
        Ok(())
    }
}
