//! Local media references.
//!
//! Photos are stored on the device under `<media root>/<subdirectory>/<filename>`.
//! Only the filename is ever written to the remote store; the file URI is
//! derived on every read, because the media root can move between app
//! installs and updates.

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::sync::SyncError;

const FILE_URI_SCHEME: &str = "file://";

/// A media file owned by a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    /// Durable file name, the only value persisted remotely.
    pub filename: String,
    /// Directory below the media root, e.g. `plants`.
    pub subdirectory: String,
    /// Session-local URI, `None` when no file backs the reference.
    #[serde(skip)]
    pub resolved_uri: Option<String>,
}

/// Maps durable filenames to file URIs under the current media root.
#[derive(Debug, Clone)]
pub struct MediaResolver {
    root: PathBuf,
}

impl MediaResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the media root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path a filename maps to, or `None` if either part would
    /// escape its directory.
    pub fn path(&self, filename: &str, subdirectory: &str) -> Option<PathBuf> {
        if !is_plain_name(filename) {
            return None;
        }
        let subdirectory = Path::new(subdirectory);
        if !subdirectory
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(subdirectory).join(filename))
    }

    /// Resolves `filename` to a file URI, or `None` if no file exists there.
    pub fn resolve(&self, filename: &str, subdirectory: &str) -> Option<String> {
        let path = self.path(filename, subdirectory)?;
        if path.is_file() {
            Some(format!("{}{}", FILE_URI_SCHEME, path.display()))
        } else {
            None
        }
    }

    /// Resolves each filename, leaving out those with no backing file.
    pub fn resolve_many<S: AsRef<str>>(&self, filenames: &[S], subdirectory: &str) -> Vec<String> {
        filenames
            .iter()
            .filter_map(|filename| self.resolve(filename.as_ref(), subdirectory))
            .collect()
    }

    /// Builds one reference per filename, in order. Entries with no backing
    /// file keep `resolved_uri: None`.
    pub fn references<S: AsRef<str>>(
        &self,
        filenames: &[S],
        subdirectory: &str,
    ) -> Vec<MediaReference> {
        filenames
            .iter()
            .map(|filename| self.reference(filename.as_ref(), subdirectory))
            .collect()
    }

    /// Builds a reference with its URI resolved.
    pub fn reference(&self, filename: &str, subdirectory: &str) -> MediaReference {
        MediaReference {
            filename: filename.to_string(),
            subdirectory: subdirectory.to_string(),
            resolved_uri: self.resolve(filename, subdirectory),
        }
    }

    /// Writes `bytes` as a new media file with a generated name.
    pub async fn store(
        &self,
        bytes: &[u8],
        subdirectory: &str,
        extension: &str,
    ) -> Result<MediaReference, SyncError> {
        let extension = extension.trim_start_matches('.');
        let filename = if extension.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), extension)
        };

        let path = self.path(&filename, subdirectory).ok_or_else(|| {
            SyncError::Media(
                self.root.join(subdirectory),
                io::Error::new(io::ErrorKind::InvalidInput, "invalid media location"),
            )
        })?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::Media(parent.to_path_buf(), e))?;
        }
        fs::write(&path, bytes)
            .await
            .map_err(|e| SyncError::Media(path.clone(), e))?;

        tracing::debug!(path = %path.display(), "Stored media file");
        Ok(self.reference(&filename, subdirectory))
    }

    /// Deletes a media file. A file that is already gone is not an error.
    pub async fn remove(&self, filename: &str, subdirectory: &str) -> Result<(), SyncError> {
        let Some(path) = self.path(filename, subdirectory) else {
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed media file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Media(path, e)),
        }
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}

/// Derives a filename from a legacy absolute URI: its trailing path segment,
/// without query or fragment.
pub fn filename_from_legacy_uri(uri: &str) -> Option<String> {
    let without_fragment = uri.split('#').next().unwrap_or(uri);
    let path = without_fragment.split('?').next().unwrap_or(without_fragment);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| is_plain_name(segment) && !segment.contains(':'))
        .map(str::to_string)
}

/// Upgrades a record's media references to the filename shape.
///
/// Current records carry filenames and are returned unchanged. Records written
/// before filenames existed only carry absolute URIs; their filenames are
/// derived from the URIs. Nothing is written back.
pub fn upgrade_legacy_filenames(filenames: Vec<String>, legacy_uris: &[String]) -> Vec<String> {
    if !filenames.is_empty() {
        return filenames;
    }
    legacy_uris
        .iter()
        .filter_map(|uri| filename_from_legacy_uri(uri))
        .collect()
}
