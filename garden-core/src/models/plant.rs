use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::media::{upgrade_legacy_filenames, MediaReference};
use crate::sync::entity::{decode_fields, non_empty};
use crate::sync::{Entity, RemoteDocument, SoftDelete, SyncError};

/// Media subdirectory for plant photos.
pub const PLANT_MEDIA_DIR: &str = "plants";

/// A plant in the user's garden.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,
    pub name: String,
    pub species: Option<String>,
    pub variety: Option<String>,
    pub location: Option<String>,
    pub planted_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub photo_filenames: Vec<String>,
    /// One per filename, resolved on read; never persisted.
    #[serde(skip)]
    pub photos: Vec<MediaReference>,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Remote shape of a plant, covering both current and legacy documents.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PlantDocument {
    name: Option<String>,
    species: Option<String>,
    variety: Option<String>,
    location: Option<String>,
    planted_on: Option<NaiveDate>,
    notes: Option<String>,
    photo_filenames: Option<Vec<String>>,
    photo_filename: Option<String>,
    #[serde(rename = "photoUris")]
    legacy_photo_uris: Option<Vec<String>>,
    #[serde(rename = "photoUri")]
    legacy_photo_uri: Option<String>,
    deleted: Option<bool>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Plant {
    /// Creates an unsaved plant. The id is assigned by the remote store.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            name: name.into(),
            species: None,
            variety: None,
            location: None,
            planted_on: None,
            notes: None,
            photo_filenames: Vec::new(),
            photos: Vec::new(),
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    pub fn with_variety(mut self, variety: impl Into<String>) -> Self {
        self.variety = Some(variety.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_planted_on(mut self, planted_on: NaiveDate) -> Self {
        self.planted_on = Some(planted_on);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_photo(mut self, filename: impl Into<String>) -> Self {
        self.photo_filenames.push(filename.into());
        self
    }
}

impl Entity for Plant {
    const COLLECTION: &'static str = "plants";
    const CACHE_KEY: &'static str = "plants";
    const MEDIA_SUBDIRECTORY: Option<&'static str> = Some(PLANT_MEDIA_DIR);

    fn id(&self) -> &str {
        &self.id
    }

    fn from_remote(doc: RemoteDocument) -> Result<Self, SyncError> {
        let RemoteDocument { id, fields } = doc;
        let doc: PlantDocument = decode_fields(fields)?;

        let mut filenames = doc.photo_filenames.unwrap_or_default();
        filenames.extend(non_empty(doc.photo_filename));
        let mut legacy_uris = doc.legacy_photo_uris.unwrap_or_default();
        legacy_uris.extend(non_empty(doc.legacy_photo_uri));

        let created_at = doc.created_at.unwrap_or_default();
        Ok(Self {
            id,
            name: doc.name.unwrap_or_default(),
            species: non_empty(doc.species),
            variety: non_empty(doc.variety),
            location: non_empty(doc.location),
            planted_on: doc.planted_on,
            notes: non_empty(doc.notes),
            photo_filenames: upgrade_legacy_filenames(filenames, &legacy_uris),
            photos: Vec::new(),
            deleted: doc.deleted.unwrap_or(false),
            deleted_at: doc.deleted_at,
            created_at,
            updated_at: doc.updated_at.unwrap_or(created_at),
        })
    }

    fn is_active(&self) -> bool {
        !self.deleted
    }

    fn media_filenames(&self) -> &[String] {
        &self.photo_filenames
    }

    fn set_media(&mut self, media: Vec<MediaReference>) {
        self.photos = media;
    }
}

impl SoftDelete for Plant {
    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl fmt::Display for Plant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.len().max(10)))?;

        if let Some(species) = &self.species {
            match &self.variety {
                Some(variety) => writeln!(f, "Species: {} '{}'", species, variety)?,
                None => writeln!(f, "Species: {}", species)?,
            }
        }
        if let Some(location) = &self.location {
            writeln!(f, "Location: {}", location)?;
        }
        if let Some(planted_on) = &self.planted_on {
            writeln!(f, "Planted: {}", planted_on)?;
        }
        if !self.photo_filenames.is_empty() {
            writeln!(f, "Photos: {}", self.photo_filenames.len())?;
        }
        if let Some(notes) = &self.notes {
            writeln!(f, "\nNotes: {}", notes)?;
        }
        if self.deleted {
            writeln!(f, "\n(in trash)")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> RemoteDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plant_new() {
        let plant = Plant::new("Basil").with_species("Ocimum basilicum");
        assert!(plant.id.is_empty());
        assert_eq!(plant.name, "Basil");
        assert_eq!(plant.species, Some("Ocimum basilicum".to_string()));
        assert!(plant.is_active());
    }

    #[test]
    fn test_from_remote_current_shape() {
        let plant = Plant::from_remote(doc(json!({
            "id": "p1",
            "userId": "u1",
            "name": "Tomato",
            "variety": "Sungold",
            "plantedOn": "2025-04-12",
            "photoFilenames": ["a.jpg", "b.jpg"],
            "deleted": false,
            "createdAt": "2025-04-12T10:00:00Z"
        })))
        .unwrap();

        assert_eq!(plant.id, "p1");
        assert_eq!(plant.variety, Some("Sungold".to_string()));
        assert_eq!(plant.planted_on, NaiveDate::from_ymd_opt(2025, 4, 12));
        assert_eq!(plant.photo_filenames, vec!["a.jpg", "b.jpg"]);
        assert_eq!(plant.updated_at, plant.created_at);
    }

    #[test]
    fn test_from_remote_legacy_photo_uri() {
        let plant = Plant::from_remote(doc(json!({
            "id": "p2",
            "name": "Fern",
            "photoUri": "file:///var/mobile/old-container/Documents/plants/fern.jpg"
        })))
        .unwrap();

        assert_eq!(plant.photo_filenames, vec!["fern.jpg"]);
    }

    #[test]
    fn test_from_remote_prefers_filenames_over_legacy_uris() {
        let plant = Plant::from_remote(doc(json!({
            "id": "p3",
            "name": "Mint",
            "photoFilename": "mint.jpg",
            "photoUris": ["file:///old/other.jpg"]
        })))
        .unwrap();

        assert_eq!(plant.photo_filenames, vec!["mint.jpg"]);
    }

    #[test]
    fn test_to_remote_excludes_id_and_uris() {
        let mut plant = Plant::new("Rose").with_photo("rose.jpg");
        plant.id = "p4".to_string();
        plant.photos = vec![MediaReference {
            filename: "rose.jpg".to_string(),
            subdirectory: PLANT_MEDIA_DIR.to_string(),
            resolved_uri: Some("file:///media/plants/rose.jpg".to_string()),
        }];

        let fields = plant.to_remote().unwrap();

        assert!(!fields.contains_key("id"));
        assert!(!fields.contains_key("photoUris"));
        assert!(!fields.contains_key("photos"));
        assert_eq!(fields.get("photoFilenames"), Some(&json!(["rose.jpg"])));
        assert_eq!(fields.get("deleted"), Some(&json!(false)));
    }

    #[test]
    fn test_cached_shape_reads_back() {
        let mut plant = Plant::new("Lavender").with_location("Front bed");
        plant.id = "p5".to_string();

        let cached = serde_json::to_value(&plant).unwrap();
        let restored = Plant::from_remote(doc(cached)).unwrap();

        assert_eq!(restored, plant);
    }

    #[test]
    fn test_deletion_fields_flip_the_flag() {
        let mut plant = Plant::new("Sage");
        plant.id = "p6".to_string();
        let mut fields = plant.to_remote().unwrap();

        fields.extend(Plant::deletion_fields(Some(Utc::now())));
        let trashed = Plant::from_remote(RemoteDocument::new("p6", fields.clone())).unwrap();
        assert!(trashed.is_deleted());
        assert!(!trashed.is_active());
        assert!(trashed.deleted_at.is_some());

        fields.extend(Plant::deletion_fields(None));
        let restored = Plant::from_remote(RemoteDocument::new("p6", fields)).unwrap();
        assert!(!restored.is_deleted());
        assert!(restored.deleted_at.is_none());
    }

    #[test]
    fn test_plant_display() {
        let plant = Plant::new("Tomato")
            .with_species("Solanum lycopersicum")
            .with_variety("Sungold")
            .with_notes("Needs staking");

        let output = format!("{}", plant);
        assert!(output.contains("Tomato"));
        assert!(output.contains("Solanum lycopersicum 'Sungold'"));
        assert!(output.contains("Needs staking"));
    }
}
