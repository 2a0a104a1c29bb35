mod backup;
mod config_cmd;
mod journal;
mod log;
mod plant;
mod task;

pub use backup::BackupCommand;
pub use config_cmd::ConfigCommand;
pub use journal::JournalCommand;
pub use log::LogCommand;
pub use plant::PlantCommand;
pub use task::TaskCommand;

use chrono::NaiveDate;
use clap::ValueEnum;
use garden_core::{
    GardenRepositories, MediaReference, MediaResolver, Serializer, StaticSession, SyncContext,
    TracingSink,
};
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{init_db, SqliteStore};
use crate::remote::HttpRemoteStore;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Collaborators shared by the data commands.
pub struct AppContext {
    pub repos: GardenRepositories,
    pub serializer: Serializer,
    pub media: Arc<MediaResolver>,
}

impl AppContext {
    /// Opens the local cache and connects the repositories to the remote store.
    pub async fn open(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let remote_config = &config.remote;
        let (Some(base_url), Some(api_key)) = (&remote_config.base_url, &remote_config.api_key)
        else {
            return Err(
                "Remote store not configured. Set remote.base_url and remote.api_key in your config file."
                    .into(),
            );
        };

        let pool = init_db(&config.database_path.value).await?;
        let serializer = Serializer::new(Arc::new(SqliteStore::new(pool)));

        let session = match &remote_config.user_id {
            Some(user_id) => StaticSession::signed_in(user_id.clone()),
            None => StaticSession::signed_out(),
        };
        let media = Arc::new(MediaResolver::new(config.media_dir.value.clone()));

        let ctx = SyncContext {
            remote: Arc::new(HttpRemoteStore::new(base_url.clone(), api_key.clone())),
            serializer: serializer.clone(),
            session: Arc::new(session),
            media: media.clone(),
            sink: Arc::new(TracingSink),
        };

        Ok(Self {
            repos: GardenRepositories::new(ctx, config.policies),
            serializer,
            media,
        })
    }
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Use YYYY-MM-DD.", value))
}

/// Copies a photo into the media directory under a generated name.
pub(crate) async fn import_photo(
    media: &MediaResolver,
    path: &Path,
    subdirectory: &str,
) -> Result<MediaReference, Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("Failed to read photo '{}': {}", path.display(), e))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");
    Ok(media.store(&bytes, subdirectory, extension).await?)
}
