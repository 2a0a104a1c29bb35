use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::media::{upgrade_legacy_filenames, MediaReference};
use crate::sync::entity::{decode_fields, non_empty};
use crate::sync::{Entity, RemoteDocument, SyncError};

/// Media subdirectory for journal photos.
pub const JOURNAL_MEDIA_DIR: &str = "journal";

/// Kind of journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Observation,
    Harvest,
    Milestone,
    Problem,
    Note,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Observation => write!(f, "observation"),
            EntryType::Harvest => write!(f, "harvest"),
            EntryType::Milestone => write!(f, "milestone"),
            EntryType::Problem => write!(f, "problem"),
            EntryType::Note => write!(f, "note"),
        }
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "observation" => Ok(EntryType::Observation),
            "harvest" => Ok(EntryType::Harvest),
            "milestone" => Ok(EntryType::Milestone),
            "problem" => Ok(EntryType::Problem),
            "note" => Ok(EntryType::Note),
            _ => Err(format!(
                "Invalid entry type '{}'. Valid options: observation, harvest, milestone, problem, note",
                s
            )),
        }
    }
}

/// A dated garden journal entry, optionally about one plant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub plant_id: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub photo_filenames: Vec<String>,
    /// One per filename, resolved on read; never persisted.
    #[serde(skip)]
    pub photos: Vec<MediaReference>,
    pub entry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct JournalEntryDocument {
    #[serde(rename = "type")]
    entry_type: Option<String>,
    plant_id: Option<String>,
    title: Option<String>,
    body: Option<String>,
    photo_filenames: Option<Vec<String>>,
    #[serde(rename = "photoUris")]
    legacy_photo_uris: Option<Vec<String>>,
    #[serde(rename = "photoUri")]
    legacy_photo_uri: Option<String>,
    entry_date: Option<NaiveDate>,
    created_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    pub fn new(entry_type: EntryType, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            entry_type,
            plant_id: None,
            title: title.into(),
            body: None,
            photo_filenames: Vec::new(),
            photos: Vec::new(),
            entry_date: now.date_naive(),
            created_at: now,
        }
    }

    pub fn with_plant_id(mut self, plant_id: impl Into<String>) -> Self {
        self.plant_id = Some(plant_id.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_entry_date(mut self, entry_date: NaiveDate) -> Self {
        self.entry_date = entry_date;
        self
    }

    pub fn with_photo(mut self, filename: impl Into<String>) -> Self {
        self.photo_filenames.push(filename.into());
        self
    }
}

impl Entity for JournalEntry {
    const COLLECTION: &'static str = "journal";
    const CACHE_KEY: &'static str = "journal";
    const MEDIA_SUBDIRECTORY: Option<&'static str> = Some(JOURNAL_MEDIA_DIR);

    fn id(&self) -> &str {
        &self.id
    }

    fn from_remote(doc: RemoteDocument) -> Result<Self, SyncError> {
        let RemoteDocument { id, fields } = doc;
        let doc: JournalEntryDocument = decode_fields(fields)?;

        let entry_type = doc
            .entry_type
            .as_deref()
            .and_then(|t| EntryType::from_str(t).ok())
            .unwrap_or(EntryType::Note);

        let mut legacy_uris = doc.legacy_photo_uris.unwrap_or_default();
        legacy_uris.extend(non_empty(doc.legacy_photo_uri));

        let created_at = doc.created_at.unwrap_or_default();
        Ok(Self {
            id,
            entry_type,
            plant_id: non_empty(doc.plant_id),
            title: doc.title.unwrap_or_default(),
            body: non_empty(doc.body),
            photo_filenames: upgrade_legacy_filenames(
                doc.photo_filenames.unwrap_or_default(),
                &legacy_uris,
            ),
            photos: Vec::new(),
            entry_date: doc.entry_date.unwrap_or_else(|| created_at.date_naive()),
            created_at,
        })
    }

    fn media_filenames(&self) -> &[String] {
        &self.photo_filenames
    }

    fn set_media(&mut self, media: Vec<MediaReference>) {
        self.photos = media;
    }
}

impl fmt::Display for JournalEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}] {}", self.entry_date, self.entry_type, self.title)?;
        if let Some(body) = &self.body {
            writeln!(f, "\n{}", body)?;
        }
        if !self.photo_filenames.is_empty() {
            writeln!(f, "\nPhotos: {}", self.photo_filenames.len())?;
        }
        Ok(())
    }
}
