//! Offline-first repository.
//!
//! A [`Repository`] serves one record family. Reads go to the remote store
//! first and fall back to the cached collection when the network fails.
//! Writes require the remote store and then update the cache so a later
//! offline read sees them.

use chrono::Utc;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use super::entity::{Entity, SoftDelete};
use super::error::SyncError;
use super::policy::{CallOutcome, RemoteCallPolicy, RepositoryPolicies};
use super::remote::{Fields, PageRequest, RemoteDocument, RemoteError, RemoteStore};
use super::sink::ErrorSink;
use crate::media::MediaResolver;
use crate::models::{JournalEntry, Plant, TaskLog, TaskTemplate};
use crate::session::Session;
use crate::store::Serializer;

/// Documents requested per page during a full fetch.
pub const PAGE_SIZE: usize = 100;

/// Collaborators shared by every repository.
#[derive(Clone)]
pub struct SyncContext {
    pub remote: Arc<dyn RemoteStore>,
    pub serializer: Serializer,
    pub session: Arc<dyn Session>,
    pub media: Arc<MediaResolver>,
    pub sink: Arc<dyn ErrorSink>,
}

/// Offline-first access to one record family.
pub struct Repository<E: Entity> {
    ctx: SyncContext,
    policies: RepositoryPolicies,
    _entity: PhantomData<fn() -> E>,
}

pub type PlantRepository = Repository<Plant>;
pub type TaskTemplateRepository = Repository<TaskTemplate>;
pub type TaskLogRepository = Repository<TaskLog>;
pub type JournalRepository = Repository<JournalEntry>;

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            policies: self.policies,
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(ctx: SyncContext) -> Self {
        Self {
            ctx,
            policies: RepositoryPolicies::default(),
            _entity: PhantomData,
        }
    }

    pub fn with_policies(mut self, policies: RepositoryPolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn policies(&self) -> &RepositoryPolicies {
        &self.policies
    }

    /// Lists active records.
    ///
    /// A successful fetch replaces the cached collection with exactly the
    /// returned records. A failed fetch is reported to the error sink and the
    /// cached collection is served instead.
    pub async fn list(&self) -> Result<Vec<E>, SyncError> {
        let owner = self.owner()?;

        match self.fetch_all(&owner).await {
            Ok(docs) => {
                let records: Vec<E> = self
                    .transform(docs)
                    .into_iter()
                    .filter(|r| r.is_active())
                    .collect();
                if let Err(err) = self.replace_cache(&records).await {
                    self.report("storage.write", "Failed to refresh cached collection", &err);
                }
                Ok(self.with_media(records))
            }
            Err(err) => {
                self.report("sync.read", "Fetch failed, serving cached records", &err);
                let cached = self.read_cache().await?;
                Ok(self.with_media(cached.into_iter().filter(|r| r.is_active()).collect()))
            }
        }
    }

    /// Lists one page of active records. The cache is only read, never
    /// rewritten.
    pub async fn list_page(&self, page: PageRequest) -> Result<Vec<E>, SyncError> {
        let owner = self.owner()?;

        let fetched = self
            .policies
            .read
            .call(|| self.ctx.remote.list(E::COLLECTION, &owner, page))
            .await
            .and_then(CallOutcome::into_result);

        match fetched {
            Ok(docs) => {
                let records = self
                    .transform(docs)
                    .into_iter()
                    .filter(|r| r.is_active())
                    .collect();
                Ok(self.with_media(records))
            }
            Err(err) => {
                self.report("sync.read", "Page fetch failed, serving cached records", &err);
                let cached = self.read_cache().await?;
                let window = cached
                    .into_iter()
                    .filter(|r| r.is_active())
                    .skip(page.offset)
                    .take(page.limit)
                    .collect();
                Ok(self.with_media(window))
            }
        }
    }

    /// Lists every record, including those outside the active view.
    ///
    /// The cached fallback only holds what the last [`Repository::list`]
    /// kept, so records outside the active view can be missing from it.
    pub async fn list_all(&self) -> Result<Vec<E>, SyncError> {
        let owner = self.owner()?;

        match self.fetch_all(&owner).await {
            Ok(docs) => Ok(self.with_media(self.transform(docs))),
            Err(err) => {
                self.report(
                    "sync.read",
                    "Fetch failed, serving cached records; inactive records may be missing",
                    &err,
                );
                let cached = self.read_cache().await?;
                Ok(self.with_media(cached))
            }
        }
    }

    /// Fetches one record by id, falling back to the cached copy when the
    /// remote store cannot be reached.
    pub async fn get(&self, id: &str) -> Result<Option<E>, SyncError> {
        let owner = self.owner()?;

        match self.fetch_one(&owner, id, self.policies.read).await {
            Ok(doc) => Ok(doc
                .and_then(|doc| self.transform(vec![doc]).pop())
                .map(|record| self.attach_media(record))),
            Err(err) => {
                self.report("sync.read", "Fetch failed, serving cached record", &err);
                let cached = self.read_cache().await?;
                Ok(cached
                    .into_iter()
                    .find(|r| r.id() == id)
                    .map(|record| self.attach_media(record)))
            }
        }
    }

    /// Inserts a new record remotely and appends it to the cache.
    ///
    /// There is no offline path: a remote failure is returned and nothing is
    /// cached.
    pub async fn create(&self, record: E) -> Result<E, SyncError> {
        let owner = self.owner()?;
        let fields = record.to_remote()?;

        let id = self
            .policies
            .write
            .call(|| {
                self.ctx
                    .remote
                    .insert(E::COLLECTION, &owner, fields.clone())
            })
            .await?
            .into_result()?;

        let created = E::from_remote(RemoteDocument::new(id, fields))?;
        self.upsert_cached(&created).await?;

        tracing::debug!(collection = E::COLLECTION, id = created.id(), "Created record");
        Ok(self.attach_media(created))
    }

    /// Writes `record` remotely, then re-fetches it and caches the canonical
    /// post-update state.
    pub async fn update(&self, record: &E) -> Result<E, SyncError> {
        let owner = self.owner()?;
        let id = record.id();
        let fields = record.to_remote()?;

        self.update_remote(&owner, id, fields).await?;
        self.refresh(&owner, id).await
    }

    /// Writes non-critical fields without raising on network failure.
    ///
    /// On success the cached record is replaced with the patched version.
    pub async fn patch_metadata(
        &self,
        id: &str,
        fields: Fields,
    ) -> Result<CallOutcome<()>, SyncError> {
        let owner = self.owner()?;

        let outcome = self
            .policies
            .metadata
            .call(|| {
                self.ctx
                    .remote
                    .update(E::COLLECTION, &owner, id, fields.clone())
            })
            .await?;

        match &outcome {
            CallOutcome::Completed(()) => {
                if let Err(err) = self.patch_cached(id, fields).await {
                    self.report("storage.write", "Failed to patch cached record", &err);
                }
            }
            CallOutcome::SoftFailed(err) => {
                self.report("sync.write", "Metadata update skipped", err);
            }
        }

        Ok(outcome)
    }

    /// Deletes a record permanently, together with its media files.
    pub async fn hard_delete(&self, id: &str) -> Result<(), SyncError> {
        let owner = self.owner()?;
        let filenames = self.owned_media(&owner, id).await?;

        self.policies
            .write
            .call(|| self.ctx.remote.delete(E::COLLECTION, &owner, id))
            .await?
            .into_result()?;

        if let Some(subdirectory) = E::MEDIA_SUBDIRECTORY {
            for filename in &filenames {
                if let Err(err) = self.ctx.media.remove(filename, subdirectory).await {
                    self.ctx.sink.log_error(
                        "media.remove",
                        "Failed to remove media file",
                        &err,
                        &[("collection", E::COLLECTION), ("filename", filename.as_str())],
                    );
                }
            }
        }

        let target = id.to_string();
        self.ctx
            .serializer
            .update_collection::<RemoteDocument, _, _>(E::CACHE_KEY, move |docs| {
                docs.retain(|doc| doc.id != target);
            })
            .await?;

        tracing::debug!(collection = E::COLLECTION, id, "Deleted record");
        Ok(())
    }

    /// Writes fields to an existing remote document under the write policy.
    /// A document that is gone fails with [`SyncError::NotFound`] without
    /// being retried.
    async fn update_remote(&self, owner: &str, id: &str, fields: Fields) -> Result<(), SyncError> {
        self.policies
            .write
            .call(|| {
                self.ctx
                    .remote
                    .update(E::COLLECTION, owner, id, fields.clone())
            })
            .await
            .and_then(CallOutcome::into_result)
            .map_err(|err| match err {
                SyncError::RemoteOperationFailed(RemoteError::NotFound) => not_found::<E>(id),
                other => other,
            })
    }

    fn owner(&self) -> Result<String, SyncError> {
        self.ctx.session.user_id().ok_or(SyncError::NotAuthenticated)
    }

    async fn fetch_all(&self, owner: &str) -> Result<Vec<RemoteDocument>, SyncError> {
        let mut docs = Vec::new();
        let mut seen = HashSet::new();
        let mut offset = 0;

        loop {
            let page = PageRequest::new(offset, PAGE_SIZE);
            let batch = self
                .policies
                .read
                .call(|| self.ctx.remote.list(E::COLLECTION, owner, page))
                .await?
                .into_result()?;

            let received = batch.len();
            let before = docs.len();
            docs.extend(batch.into_iter().filter(|doc| seen.insert(doc.id.clone())));
            if received < PAGE_SIZE {
                break;
            }
            // A store that ignores the offset keeps answering the same page.
            if docs.len() == before {
                tracing::warn!(
                    collection = E::COLLECTION,
                    offset,
                    "Remote page repeated known records, stopping fetch"
                );
                break;
            }
            offset += received;
        }

        tracing::debug!(collection = E::COLLECTION, count = docs.len(), "Fetched collection");
        Ok(docs)
    }

    async fn fetch_one(
        &self,
        owner: &str,
        id: &str,
        policy: RemoteCallPolicy,
    ) -> Result<Option<RemoteDocument>, SyncError> {
        policy
            .call(|| self.ctx.remote.get(E::COLLECTION, owner, id))
            .await?
            .into_result()
    }

    /// Re-fetches a record after a write and replaces it in the cache.
    async fn refresh(&self, owner: &str, id: &str) -> Result<E, SyncError> {
        let record = self
            .fetch_one(owner, id, self.policies.read)
            .await?
            .map(E::from_remote)
            .transpose()?
            .ok_or_else(|| not_found::<E>(id))?;

        self.upsert_cached(&record).await?;
        Ok(self.attach_media(record))
    }

    /// Media filenames of a record, looked up in the cache first.
    async fn owned_media(&self, owner: &str, id: &str) -> Result<Vec<String>, SyncError> {
        if E::MEDIA_SUBDIRECTORY.is_none() {
            return Ok(Vec::new());
        }

        let cached = self.read_cache().await?;
        if let Some(record) = cached.iter().find(|r| r.id() == id) {
            return Ok(record.media_filenames().to_vec());
        }

        // Not cached; the remote copy is the only other source.
        let remote = self.fetch_one(owner, id, self.policies.read).await;
        Ok(match remote {
            Ok(Some(doc)) => self
                .transform(vec![doc])
                .pop()
                .map(|record| record.media_filenames().to_vec())
                .unwrap_or_default(),
            _ => Vec::new(),
        })
    }

    /// Converts remote documents, skipping any that do not decode.
    fn transform(&self, docs: Vec<RemoteDocument>) -> Vec<E> {
        docs.into_iter()
            .filter_map(|doc| {
                let id = doc.id.clone();
                match E::from_remote(doc) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        self.ctx.sink.log_error(
                            "sync.transform",
                            "Skipping malformed record",
                            &err,
                            &[("collection", E::COLLECTION), ("id", id.as_str())],
                        );
                        None
                    }
                }
            })
            .collect()
    }

    fn attach_media(&self, mut record: E) -> E {
        if let Some(subdirectory) = E::MEDIA_SUBDIRECTORY {
            let media = self
                .ctx
                .media
                .references(record.media_filenames(), subdirectory);
            record.set_media(media);
        }
        record
    }

    fn with_media(&self, records: Vec<E>) -> Vec<E> {
        records
            .into_iter()
            .map(|record| self.attach_media(record))
            .collect()
    }

    fn report(&self, category: &str, message: &str, err: &SyncError) {
        self.ctx
            .sink
            .log_error(category, message, err, &[("collection", E::COLLECTION)]);
    }

    async fn read_cache(&self) -> Result<Vec<E>, SyncError> {
        let docs = self
            .ctx
            .serializer
            .read_collection::<RemoteDocument>(E::CACHE_KEY)
            .await?;
        Ok(self.transform(docs))
    }

    async fn replace_cache(&self, records: &[E]) -> Result<(), SyncError> {
        let docs = records
            .iter()
            .map(|record| record.to_cached())
            .collect::<Result<Vec<_>, _>>()?;
        self.ctx
            .serializer
            .write_collection(E::CACHE_KEY, docs)
            .await
    }

    async fn upsert_cached(&self, record: &E) -> Result<(), SyncError> {
        let doc = record.to_cached()?;
        self.ctx
            .serializer
            .update_collection::<RemoteDocument, _, _>(E::CACHE_KEY, move |docs| {
                match docs.iter().position(|d| d.id == doc.id) {
                    Some(index) => docs[index] = doc,
                    None => docs.push(doc),
                }
            })
            .await
    }

    async fn patch_cached(&self, id: &str, fields: Fields) -> Result<(), SyncError> {
        let target = id.to_string();
        self.ctx
            .serializer
            .update_collection::<RemoteDocument, _, _>(E::CACHE_KEY, move |docs| {
                if let Some(doc) = docs.iter_mut().find(|d| d.id == target) {
                    doc.fields.extend(fields);
                }
            })
            .await
    }
}

impl<E: SoftDelete> Repository<E> {
    /// Flags a record deleted. The cached copy is kept but leaves the active
    /// view.
    pub async fn soft_delete(&self, id: &str) -> Result<(), SyncError> {
        let owner = self.owner()?;
        let fields = E::deletion_fields(Some(Utc::now()));

        self.update_remote(&owner, id, fields.clone()).await?;
        self.patch_cached(id, fields).await?;
        tracing::debug!(collection = E::COLLECTION, id, "Moved record to trash");
        Ok(())
    }

    /// Clears the deleted flag and returns the restored record.
    pub async fn restore(&self, id: &str) -> Result<E, SyncError> {
        let owner = self.owner()?;
        self.update_remote(&owner, id, E::deletion_fields(None)).await?;
        self.refresh(&owner, id).await
    }

    /// Lists records in the trash.
    pub async fn list_deleted(&self) -> Result<Vec<E>, SyncError> {
        let owner = self.owner()?;

        let records = match self.fetch_all(&owner).await {
            Ok(docs) => self.transform(docs),
            Err(err) => {
                self.report("sync.read", "Fetch failed, serving cached records", &err);
                self.read_cache().await?
            }
        };

        Ok(self.with_media(records.into_iter().filter(|r| r.is_deleted()).collect()))
    }
}

fn not_found<E: Entity>(id: &str) -> SyncError {
    SyncError::NotFound {
        collection: E::COLLECTION.to_string(),
        id: id.to_string(),
    }
}

/// One repository per record family, sharing a context.
#[derive(Clone)]
pub struct GardenRepositories {
    pub plants: PlantRepository,
    pub tasks: TaskTemplateRepository,
    pub task_logs: TaskLogRepository,
    pub journal: JournalRepository,
}

impl GardenRepositories {
    pub fn new(ctx: SyncContext, policies: RepositoryPolicies) -> Self {
        Self {
            plants: Repository::new(ctx.clone()).with_policies(policies),
            tasks: Repository::new(ctx.clone()).with_policies(policies),
            task_logs: Repository::new(ctx.clone()).with_policies(policies),
            journal: Repository::new(ctx).with_policies(policies),
        }
    }
}
