//! Per-family parameters of the offline-first repository.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::error::SyncError;
use crate::media::MediaReference;
use super::remote::{Fields, RemoteDocument};

/// A record family synced between the remote store and the local cache.
///
/// The domain type's `Serialize` output is also its cached shape: a remote
/// document (`id` plus fields) without any locally derived values. Cached
/// records are therefore read back through [`Entity::from_remote`], which is
/// the single place legacy shapes get upgraded.
pub trait Entity: Serialize + Clone + Send + Sync + 'static {
    /// Remote collection name.
    const COLLECTION: &'static str;
    /// Key of the cached collection in the local store.
    const CACHE_KEY: &'static str;
    /// Media subdirectory for records that own photos.
    const MEDIA_SUBDIRECTORY: Option<&'static str> = None;

    fn id(&self) -> &str;

    /// Transforms a remote (or cached) document into the domain shape.
    fn from_remote(doc: RemoteDocument) -> Result<Self, SyncError>;

    /// Builds the remote payload: domain fields only, no id.
    fn to_remote(&self) -> Result<Fields, SyncError> {
        match serde_json::to_value(self)? {
            Value::Object(mut fields) => {
                fields.remove("id");
                Ok(fields)
            }
            other => Err(SyncError::Validation(format!(
                "{} record did not serialize to an object: {}",
                Self::COLLECTION,
                other
            ))),
        }
    }

    /// Builds the cached shape: the remote document without derived values.
    fn to_cached(&self) -> Result<RemoteDocument, SyncError> {
        Ok(RemoteDocument::new(self.id(), self.to_remote()?))
    }

    /// Whether the record belongs in the active view.
    fn is_active(&self) -> bool {
        true
    }

    /// Filenames of media files owned by the record.
    fn media_filenames(&self) -> &[String] {
        &[]
    }

    /// Receives one reference per entry of [`Entity::media_filenames`].
    fn set_media(&mut self, _media: Vec<MediaReference>) {}
}

/// A family whose deletes only flag records, so they can be restored.
pub trait SoftDelete: Entity {
    fn is_deleted(&self) -> bool;

    /// Remote fields that flag a record deleted, or clear the flag with `None`.
    fn deletion_fields(deleted_at: Option<DateTime<Utc>>) -> Fields {
        let mut fields = Fields::new();
        fields.insert("deleted".to_string(), Value::Bool(deleted_at.is_some()));
        fields.insert(
            "deletedAt".to_string(),
            deleted_at
                .map(|at| Value::String(at.to_rfc3339()))
                .unwrap_or(Value::Null),
        );
        fields
    }
}

/// Decodes a document's field map into a remote-shape struct.
pub(crate) fn decode_fields<D: DeserializeOwned>(fields: Fields) -> Result<D, SyncError> {
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Keeps the non-empty value of an optional text field.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
