//! Offline-first sync layer.
//!
//! Every record family is served by a [`Repository`], which reads through the
//! remote document store and falls back to a locally cached collection:
//!
//! 1. Remote calls go through a [`RemoteCallPolicy`] (deadline and retries)
//! 2. Successful full fetches replace the cached collection
//! 3. Failed reads are reported to an [`ErrorSink`] and served from the cache
//! 4. Cache access is serialized through a [`Serializer`](crate::store::Serializer)

pub mod entity;
mod error;
mod policy;
mod remote;
mod repository;
mod sink;

pub use entity::{Entity, SoftDelete};
pub use error::SyncError;
pub use policy::{
    CallOutcome, RemoteCallPolicy, RepositoryPolicies, DEFAULT_MAX_RETRIES,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
};
pub use remote::{Fields, PageRequest, RemoteDocument, RemoteError, RemoteStore, OWNER_FIELD};
pub use repository::{
    GardenRepositories, JournalRepository, PlantRepository, Repository, SyncContext,
    TaskLogRepository, TaskTemplateRepository, PAGE_SIZE,
};
pub use sink::{ErrorSink, TracingSink};
