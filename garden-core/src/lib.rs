//! Garden Log Core Library
//!
//! Entity models and the offline-first sync layer shared by Garden Log
//! applications.

pub mod backup;
pub mod media;
pub mod models;
pub mod session;
pub mod store;
pub mod sync;

pub use backup::{merge_by_id, parse_artifact, Backup, BackupSnapshot, ImportMode, ImportSummary};
pub use media::{MediaReference, MediaResolver};
pub use models::{EntryType, JournalEntry, Plant, TaskLog, TaskTemplate, TaskType};
pub use session::{Session, StaticSession};
pub use store::{FileStore, LocalStore, MemoryStore, Serializer, StoreError};
pub use sync::{
    CallOutcome, Entity, ErrorSink, GardenRepositories, PageRequest, RemoteCallPolicy,
    RemoteDocument, RemoteError, RemoteStore, Repository, RepositoryPolicies, SoftDelete,
    SyncContext, SyncError, TracingSink,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
