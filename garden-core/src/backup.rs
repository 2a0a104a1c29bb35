//! Backup export and import.
//!
//! A backup is one JSON object holding every record family:
//!
//! ```json
//! {"version": "1.0", "exportDate": "...", "plants": [], "tasks": [], "taskLogs": [], "journal": []}
//! ```
//!
//! Media files never travel with a backup, only their filenames.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::models::{JournalEntry, Plant, TaskLog, TaskTemplate};
use crate::store::{load_collection, save_collection, Serializer};
use crate::sync::{Entity, GardenRepositories, RemoteDocument, SyncError};

/// Artifact format version written by [`Backup::export`].
pub const BACKUP_VERSION: &str = "1.0";

/// Every record family at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub plants: Vec<Plant>,
    pub tasks: Vec<TaskTemplate>,
    pub task_logs: Vec<TaskLog>,
    pub journal: Vec<JournalEntry>,
}

impl BackupSnapshot {
    pub fn to_json(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// How imported records combine with the cached ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportMode {
    /// Replace each cached collection with the imported one.
    #[default]
    Overwrite,
    /// Combine by id; the imported record wins.
    Merge,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportMode::Overwrite => write!(f, "overwrite"),
            ImportMode::Merge => write!(f, "merge"),
        }
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(ImportMode::Overwrite),
            "merge" => Ok(ImportMode::Merge),
            _ => Err(format!(
                "Invalid import mode '{}'. Valid options: overwrite, merge",
                s
            )),
        }
    }
}

/// Records imported per family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub plants: usize,
    pub tasks: usize,
    pub task_logs: usize,
    pub journal: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} plant(s), {} task(s), {} task log(s), {} journal entr{}",
            self.plants,
            self.tasks,
            self.task_logs,
            self.journal,
            if self.journal == 1 { "y" } else { "ies" }
        )
    }
}

/// Exports and imports backups through the repositories and the cache.
#[derive(Clone)]
pub struct Backup {
    repos: GardenRepositories,
    serializer: Serializer,
}

impl Backup {
    pub fn new(repos: GardenRepositories, serializer: Serializer) -> Self {
        Self { repos, serializer }
    }

    /// Collects every record of every family, deleted ones included.
    ///
    /// A family whose fetch fails is exported from its cached collection and
    /// the failure goes to the error sink. The cache only holds the active
    /// view, so an offline export leaves out soft-deleted plants.
    pub async fn export(&self) -> Result<BackupSnapshot, SyncError> {
        let snapshot = BackupSnapshot {
            version: BACKUP_VERSION.to_string(),
            export_date: Utc::now(),
            plants: self.repos.plants.list_all().await?,
            tasks: self.repos.tasks.list_all().await?,
            task_logs: self.repos.task_logs.list_all().await?,
            journal: self.repos.journal.list_all().await?,
        };

        tracing::info!(
            plants = snapshot.plants.len(),
            tasks = snapshot.tasks.len(),
            task_logs = snapshot.task_logs.len(),
            journal = snapshot.journal.len(),
            "Exported backup"
        );
        Ok(snapshot)
    }

    /// Exports a backup and writes it to `path`.
    pub async fn write_to(&self, path: &Path) -> Result<BackupSnapshot, SyncError> {
        let snapshot = self.export().await?;
        let json = snapshot.to_json()?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| SyncError::Io(path.to_path_buf(), e))?;
        Ok(snapshot)
    }

    /// Validates `json` and writes its records into the cache.
    ///
    /// Nothing is written unless the whole artifact is valid. All four
    /// collections are written in one queued storage operation.
    pub async fn import(&self, json: &str, mode: ImportMode) -> Result<ImportSummary, SyncError> {
        let snapshot = parse_artifact(json)?;
        let summary = ImportSummary {
            plants: snapshot.plants.len(),
            tasks: snapshot.tasks.len(),
            task_logs: snapshot.task_logs.len(),
            journal: snapshot.journal.len(),
        };

        let collections = vec![
            (Plant::CACHE_KEY, cached(&snapshot.plants)?),
            (TaskTemplate::CACHE_KEY, cached(&snapshot.tasks)?),
            (TaskLog::CACHE_KEY, cached(&snapshot.task_logs)?),
            (JournalEntry::CACHE_KEY, cached(&snapshot.journal)?),
        ];

        self.serializer
            .submit(move |store| async move {
                for (key, imported) in collections {
                    let records = match mode {
                        ImportMode::Overwrite => imported,
                        ImportMode::Merge => {
                            let existing =
                                load_collection::<RemoteDocument>(store.as_ref(), key).await?;
                            merge_by_id(existing, imported)
                        }
                    };
                    save_collection(store.as_ref(), key, &records).await?;
                }
                Ok(())
            })
            .await?;

        tracing::info!(%mode, %summary, "Imported backup");
        Ok(summary)
    }

    /// Reads a backup file and imports it.
    pub async fn read_from(&self, path: &Path, mode: ImportMode) -> Result<ImportSummary, SyncError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::Io(path.to_path_buf(), e))?;
        self.import(&json, mode).await
    }
}

fn cached<E: Entity>(records: &[E]) -> Result<Vec<RemoteDocument>, SyncError> {
    records.iter().map(|record| record.to_cached()).collect()
}

/// Parses and validates a backup artifact.
///
/// Checks run in order: `version`, the `plants`/`tasks`/`journal` arrays, an
/// optional `taskLogs` array, a non-empty `id` on every record, and a
/// non-empty `type` on task and journal records. The first failure is
/// returned as [`SyncError::Validation`].
pub fn parse_artifact(json: &str) -> Result<BackupSnapshot, SyncError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| SyncError::Validation(format!("not valid JSON: {}", e)))?;
    let Value::Object(mut root) = value else {
        return Err(invalid("expected a JSON object"));
    };

    let version = match root.get("version") {
        Some(Value::String(v)) if !v.trim().is_empty() => v.clone(),
        _ => return Err(invalid("missing version")),
    };

    let plants = take_array(&mut root, "plants")?;
    let tasks = take_array(&mut root, "tasks")?;
    let journal = take_array(&mut root, "journal")?;
    let task_logs = match root.remove("taskLogs") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(invalid("taskLogs must be an array")),
    };

    let plants = check_records(plants, "plants", false)?;
    let tasks = check_records(tasks, "tasks", true)?;
    let task_logs = check_records(task_logs, "taskLogs", false)?;
    let journal = check_records(journal, "journal", true)?;

    let export_date = root
        .get("exportDate")
        .and_then(Value::as_str)
        .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
        .map(|date| date.with_timezone(&Utc))
        .unwrap_or_default();

    Ok(BackupSnapshot {
        version,
        export_date,
        plants: decode_records(plants, "plants")?,
        tasks: decode_records(tasks, "tasks")?,
        task_logs: decode_records(task_logs, "taskLogs")?,
        journal: decode_records(journal, "journal")?,
    })
}

/// Combines two record lists by id.
///
/// Existing records keep their position and are replaced by an imported record
/// with the same id. Imported records with new ids are appended in order.
pub fn merge_by_id(existing: Vec<RemoteDocument>, imported: Vec<RemoteDocument>) -> Vec<RemoteDocument> {
    let mut merged = existing;
    let mut index: HashMap<String, usize> = merged
        .iter()
        .enumerate()
        .map(|(i, doc)| (doc.id.clone(), i))
        .collect();

    for doc in imported {
        match index.get(&doc.id) {
            Some(&i) => merged[i] = doc,
            None => {
                index.insert(doc.id.clone(), merged.len());
                merged.push(doc);
            }
        }
    }
    merged
}

fn invalid(message: impl Into<String>) -> SyncError {
    SyncError::Validation(message.into())
}

fn take_array(root: &mut Map<String, Value>, field: &str) -> Result<Vec<Value>, SyncError> {
    match root.remove(field) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(invalid(format!("{} must be an array", field))),
        None => Err(invalid(format!("missing {} array", field))),
    }
}

fn check_records(
    items: Vec<Value>,
    family: &str,
    requires_type: bool,
) -> Result<Vec<RemoteDocument>, SyncError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let Value::Object(mut fields) = item else {
                return Err(invalid(format!("{}[{}] is not an object", family, i)));
            };
            let id = match fields.remove("id") {
                Some(Value::String(id)) if !id.trim().is_empty() => id,
                _ => return Err(invalid(format!("{}[{}] is missing an id", family, i))),
            };
            if requires_type {
                match fields.get("type") {
                    Some(Value::String(t)) if !t.trim().is_empty() => {}
                    _ => {
                        return Err(invalid(format!(
                            "{}[{}] ({}) is missing a type",
                            family, i, id
                        )))
                    }
                }
            }
            Ok(RemoteDocument::new(id, fields))
        })
        .collect()
}

fn decode_records<E: Entity>(docs: Vec<RemoteDocument>, family: &str) -> Result<Vec<E>, SyncError> {
    docs.into_iter()
        .map(|doc| {
            let id = doc.id.clone();
            E::from_remote(doc)
                .map_err(|e| invalid(format!("{} record {} could not be read: {}", family, id, e)))
        })
        .collect()
}
